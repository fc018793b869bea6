//! Well-known annotation keys written by the engine's sources

/// Registry reference of the image tracked by an OCI phase
pub const OCI_IMAGE_URL: &str = "dev.getglu.oci.image.url";

/// Web URL of the commit recorded in a git-backed state
pub const GIT_COMMIT_URL: &str = "dev.getglu.git.commit.url";

/// URL of the proposal (pull request) opened by a git promotion
pub const GIT_PROPOSAL_URL: &str = "dev.getglu.git.proposal.url";

/// Number of the proposal opened by a git promotion
pub const GIT_PROPOSAL_NUMBER: &str = "dev.getglu.git.proposal.number";
