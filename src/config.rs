use crate::error::Error;

#[derive(Debug, PartialEq)]
pub struct Config {
    pub images: Vec<String>,
}

impl Config {
    /// Builds a `Config` from the image paths the CLI collected (program name already
    /// stripped, no flags to parse). At least one image is required.
    pub fn new(images: Vec<String>) -> Result<Self, Error> {
        if images.is_empty() {
            return Err(Error::Usage);
        }

        Ok(Self { images })
    }
}
