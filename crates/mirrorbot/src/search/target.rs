//! Which URL a repository is queued under.

use serde::{Deserialize, Serialize};

use super::CandidateRepo;

/// Transport used for clone targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloneProtocol {
    #[default]
    Ssh,
    Https,
}

/// Whether the downstream worker clones the repository or forks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetMode {
    Clone(CloneProtocol),
    Fork,
}

impl Default for TargetMode {
    fn default() -> Self {
        TargetMode::Clone(CloneProtocol::default())
    }
}

impl TargetMode {
    pub fn new(fork_instead_of_clone: bool, protocol: CloneProtocol) -> Self {
        if fork_instead_of_clone {
            TargetMode::Fork
        } else {
            TargetMode::Clone(protocol)
        }
    }

    /// The job payload for `repo` in this mode.
    pub fn resolve<'a>(&self, repo: &'a CandidateRepo) -> &'a str {
        match self {
            TargetMode::Clone(CloneProtocol::Ssh) => &repo.ssh_url,
            TargetMode::Clone(CloneProtocol::Https) => &repo.clone_url,
            TargetMode::Fork => &repo.html_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> CandidateRepo {
        CandidateRepo {
            full_name: "octo/cat".to_string(),
            ssh_url: "git@github.com:octo/cat.git".to_string(),
            clone_url: "https://github.com/octo/cat.git".to_string(),
            html_url: "https://github.com/octo/cat".to_string(),
            stars: 1,
            pushed_at: None,
            language: None,
            description: None,
        }
    }

    #[test]
    fn test_clone_mode_uses_the_configured_protocol() {
        let repo = repo();
        assert_eq!(
            TargetMode::Clone(CloneProtocol::Ssh).resolve(&repo),
            "git@github.com:octo/cat.git"
        );
        assert_eq!(
            TargetMode::Clone(CloneProtocol::Https).resolve(&repo),
            "https://github.com/octo/cat.git"
        );
    }

    #[test]
    fn test_fork_mode_uses_the_web_page() {
        assert_eq!(
            TargetMode::new(true, CloneProtocol::Ssh).resolve(&repo()),
            "https://github.com/octo/cat"
        );
        assert_eq!(TargetMode::default(), TargetMode::new(false, CloneProtocol::Ssh));
    }
}
