use anyhow::Result;
use regex::Regex;

/// Checks dialable numbers: optional `+`, then 7 to 15 digits.
#[derive(Debug, Clone)]
pub struct NumberValidator {
    pattern: Regex,
}

impl NumberValidator {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(r"^\+?[0-9]{7,15}$")?;
        Ok(Self { pattern })
    }

    pub fn is_valid(&self, number: &str) -> bool {
        self.pattern.is_match(number)
    }
}
