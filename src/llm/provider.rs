use std::path::PathBuf;

use async_trait::async_trait;

use crate::errors::ScoutResult;

/// The reasoning-oracle boundary: a prompt plus screenshots in, free text
/// out. An `Err` means the transport itself failed (network, auth, rate
/// limit) and carries a human-readable diagnostic; whatever the model said
/// comes back verbatim in `Ok` for the parser to deal with.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn get_response(&self, prompt: &str, images: &[PathBuf]) -> ScoutResult<String>;
}
