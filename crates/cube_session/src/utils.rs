//! Factory functions for building coordinators.
//!
//! These cover the common wiring: a validated configuration, a random letter
//! pool and a word list judge.

use crate::collaborators::{GuessJudge, LetterPool, RandomLetterPool, WordListJudge};
use crate::config::SessionConfig;
use crate::coordinator::SessionCoordinator;

/// Creates a coordinator over the default two-station layout.
///
/// Letters are random and the judge knows no words, so every guess is
/// judged bad. Useful for exercising start detection and rack mirroring.
pub fn create_coordinator() -> SessionCoordinator {
    SessionCoordinator::new(
        SessionConfig::default(),
        Box::new(RandomLetterPool::new()),
        Box::new(WordListJudge::default()),
    )
}

/// Creates a coordinator after validating `config`.
///
/// # Arguments
///
/// * `config` - Station layout and timing
/// * `pool` - Letter source used at every session start
/// * `judge` - Dictionary for cube and keyboard guesses
///
/// # Returns
///
/// The coordinator, or the validation message for the first problem in
/// `config`.
pub fn create_coordinator_with(
    config: SessionConfig,
    pool: Box<dyn LetterPool>,
    judge: Box<dyn GuessJudge>,
) -> Result<SessionCoordinator, String> {
    config.validate()?;
    Ok(SessionCoordinator::new(config, pool, judge))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::FixedLetterPool;

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SessionConfig {
            stations: Vec::new(),
            ..SessionConfig::default()
        };
        let result = create_coordinator_with(
            config,
            Box::new(FixedLetterPool::new(['A'; 6])),
            Box::new(WordListJudge::default()),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_default_coordinator_starts_waiting() {
        let coordinator = create_coordinator();
        assert!(!coordinator.phase().is_running());
        assert_eq!(coordinator.epoch(), 0);
        assert!(coordinator.start_enabled());
    }
}
