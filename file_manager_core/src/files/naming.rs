use rand::distributions::Alphanumeric;
use rand::Rng;

use super::content_type::extension_of;
use crate::config::settings::DEFAULT_FILE_NAME_LENGTH;

/// Replaces caller-supplied names with `[A-Za-z0-9]{length}` plus the original
/// extension.
///
/// Characters come uniformly from a 62-symbol alphabet through the thread-local
/// CSPRNG, so a name of length `L` is one of `62^L` values (about 190 bits at
/// the default length of 32). No lookup against existing files is made:
/// uniqueness is probabilistic, and the overwrite check in the storage
/// provider is the only guard against the negligible chance of a collision.
#[derive(Debug, Clone)]
pub struct SecureNameGenerator {
    length: usize,
}

impl Default for SecureNameGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_FILE_NAME_LENGTH)
    }
}

impl SecureNameGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn generate_secure_name(&self, original_file_name: &str) -> String {
        let extension = extension_of(original_file_name);

        let mut name: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect();
        name.push_str(extension);

        name
    }
}
