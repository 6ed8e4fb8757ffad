//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::http::RequestDescriptor;
use crate::pagination::PageRequest;
use crate::session::AsyncRestSession;
use crate::types::{JsonValue, Method};
use std::io::Write;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let session = AsyncRestSession::new(self.session_config()?)?;
        let mut out = std::io::stdout();

        let result = match &self.cli.command {
            Commands::Get {
                path,
                query,
                total_pages,
                direction,
                iterate,
            } => {
                let request = query
                    .iter()
                    .fold(RequestDescriptor::get(path.as_str()), |request, (key, value)| {
                        request.query(key.as_str(), value)
                    });

                match total_pages {
                    None => {
                        let body = session.send(&request).await?;
                        self.print(&mut out, body.as_ref())
                    }
                    Some(total_pages) => {
                        let pages = PageRequest::new(request)
                            .total_pages(*total_pages)
                            .direction(*direction);
                        if *iterate {
                            let mut items = session.iter_pages(pages);
                            while let Some(item) = items.next().await? {
                                writeln!(out, "{item}")?;
                            }
                            Ok(())
                        } else {
                            let merged = session.get_pages(pages).await?;
                            self.print(&mut out, Some(&merged))
                        }
                    }
                }
            }
            Commands::Post { path, body } => {
                let request = with_body(Method::POST, path, body.as_deref())?;
                let body = session.send(&request).await?;
                self.print(&mut out, body.as_ref())
            }
            Commands::Put { path, body } => {
                let request = with_body(Method::PUT, path, body.as_deref())?;
                let body = session.send(&request).await?;
                self.print(&mut out, body.as_ref())
            }
            Commands::Delete { path } => {
                let body = session.delete(path).await?;
                self.print(&mut out, body.as_ref())
            }
        };

        session.close();
        result
    }

    /// Session configuration from the config file and flags
    pub fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.cli.config {
            Some(path) => SessionConfig::from_yaml_file(path)?,
            None => SessionConfig {
                caller: Some(format!("{}-cli", crate::NAME)),
                ..SessionConfig::default()
            },
        };

        if let Some(key) = &self.cli.api_key {
            config.api_key = Some(key.clone());
        }
        if let Some(base_url) = &self.cli.base_url {
            config.base_url.clone_from(base_url);
        }
        if self.cli.simulate {
            config.simulate = true;
        }

        match &self.cli.log_dir {
            Some(dir) => {
                config.logging.output_log = true;
                config.logging.log_path = Some(dir.clone());
            }
            None if self.cli.config.is_none() => config.logging.output_log = false,
            None => {}
        }
        if self.cli.quiet {
            config.logging.suppress_logging = true;
        }

        Ok(config)
    }

    fn print(&self, out: &mut impl Write, body: Option<&JsonValue>) -> Result<()> {
        let Some(body) = body else {
            return Ok(());
        };
        let text = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(body)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(body)?,
        };
        writeln!(out, "{text}")?;
        Ok(())
    }
}

fn with_body(method: Method, path: &str, body: Option<&str>) -> Result<RequestDescriptor> {
    let request = RequestDescriptor::new(method, path);
    match body {
        Some(raw) => {
            let value: JsonValue =
                serde_json::from_str(raw).map_err(|e| Error::invalid_value("body", e.to_string()))?;
            Ok(request.json(value))
        }
        None => Ok(request),
    }
}
