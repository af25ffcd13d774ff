//! Output formatting: URLs on stdout, diagnostics on stderr

use crate::config::Config;
use crate::error::YplError;
use crate::utils::url::watch_url;
use std::io::{self, Stderr, Stdout, Write};
use std::path::Path;
use tracing::warn;

/// Output formatter for ypl
pub struct OutputFormatter<O = Stdout, E = Stderr> {
    out: O,
    err: E,
    verbose: bool,
    printed: usize,
}

impl OutputFormatter {
    /// Formatter writing to the process' standard streams
    pub fn new(verbose: bool) -> Self {
        Self::with_writers(io::stdout(), io::stderr(), verbose)
    }
}

impl<O: Write, E: Write> OutputFormatter<O, E> {
    pub fn with_writers(out: O, err: E, verbose: bool) -> Self {
        Self {
            out,
            err,
            verbose,
            printed: 0,
        }
    }

    /// Number of URLs printed so far
    pub fn printed(&self) -> usize {
        self.printed
    }

    /// Open the URL block; separated from diagnostics in verbose mode
    pub fn begin(&mut self) -> io::Result<()> {
        if self.verbose {
            writeln!(self.err)?;
        }
        Ok(())
    }

    /// Print the watch URL of one video
    pub fn print_video(&mut self, video_id: &str) -> io::Result<()> {
        writeln!(self.out, "{}", watch_url(video_id))?;
        self.out.flush()?;
        self.printed += 1;
        Ok(())
    }

    /// Close the URL block and report the count
    pub fn finish(&mut self) -> io::Result<()> {
        if self.verbose {
            writeln!(self.err)?;
        }
        writeln!(self.err, "\nRetrieved {} elements.", self.printed)
    }

    /// Explain where the client secrets are expected
    pub fn print_missing_secrets(&mut self, file_name: &str, config_dir: &Path) -> io::Result<()> {
        writeln!(
            self.err,
            "Please ensure a {} is located at {}",
            file_name,
            config_dir.display()
        )
    }

    /// Check that the client secrets exist. When they don't, explain where
    /// they belong and create the config directory to receive them.
    pub fn require_client_secrets(&mut self, config: &Config) -> io::Result<bool> {
        if config.client_secrets_path().exists() {
            return Ok(true);
        }
        self.print_missing_secrets(&config.client_secrets_file, &config.config_dir)?;
        if let Err(err) = config.ensure_config_dir() {
            warn!("Could not create {}: {}", config.config_dir.display(), err);
        }
        Ok(false)
    }

    /// Report a failed enumeration
    pub fn print_fetch_error(&mut self, error: &YplError) -> io::Result<()> {
        writeln!(
            self.err,
            "There was an error retrieving the playlist. Check the details:\n{}",
            error
        )
    }

    /// Report any other fatal error
    pub fn error(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.err, "Error: {}", message)
    }

    pub fn into_writers(self) -> (O, E) {
        (self.out, self.err)
    }
}
