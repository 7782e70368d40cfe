use anyhow::Result;

use crate::config::config;

pub struct ConfigShowCommand;

impl ConfigShowCommand {
    pub fn execute(&self) -> Result<()> {
        let config = config()?;
        print!("{}", toml::to_string_pretty(config)?);
        Ok(())
    }
}
