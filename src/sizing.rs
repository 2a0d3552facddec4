// Worker-count policy extracted for testing.
// Cube-root growth keeps very large manifests from spawning thousands of threads.
use crate::error::ConfigError;

pub const DEFAULT_MAX_WORKERS: usize = 50;

/// Pick how many workers drain a queue of `task_count` tasks.
///
/// `min(max_workers, floor(cbrt(task_count)))`, never below 1 for a non-empty
/// queue and exactly 0 for an empty one.
pub fn choose_worker_count(task_count: usize, max_workers: usize) -> usize {
    if task_count == 0 {
        return 0;
    }
    integer_cbrt(task_count).clamp(1, max_workers.max(1))
}

/// Apply the default ceiling and reject a zero ceiling.
pub fn resolve_max_workers(requested: Option<usize>) -> Result<usize, ConfigError> {
    match requested {
        None => Ok(DEFAULT_MAX_WORKERS),
        Some(0) => Err(ConfigError::InvalidWorkerCount(0)),
        Some(n) => Ok(n),
    }
}

// floor(cbrt(n)) without float rounding surprises at perfect cubes.
fn integer_cbrt(n: usize) -> usize {
    let mut r = (n as f64).cbrt() as usize;
    while r > 0 && r.saturating_mul(r).saturating_mul(r) > n {
        r -= 1;
    }
    while (r + 1).saturating_mul(r + 1).saturating_mul(r + 1) <= n {
        r += 1;
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_tasks_get_no_workers() {
        assert_eq!(choose_worker_count(0, 50), 0);
        assert_eq!(choose_worker_count(0, 1), 0);
    }

    #[test]
    fn single_task() {
        assert_eq!(choose_worker_count(1, 50), 1);
    }

    #[test]
    fn ceiling_caps_growth() {
        // cbrt(1000) = 10 -> capped at 5
        assert_eq!(choose_worker_count(1000, 5), 5);
    }

    #[test]
    fn perfect_cubes_are_exact() {
        assert_eq!(choose_worker_count(27, 50), 3);
        assert_eq!(choose_worker_count(26, 50), 2);
        assert_eq!(choose_worker_count(1000, 50), 10);
        assert_eq!(choose_worker_count(999, 50), 9);
        assert_eq!(choose_worker_count(1_000_000, 500), 100);
    }

    #[test]
    fn small_manifests_still_get_one_worker() {
        for n in 1..8 {
            assert_eq!(choose_worker_count(n, 50), 1, "n = {}", n);
        }
    }

    #[test]
    fn large_manifest_hits_default_ceiling() {
        // 200k images -> cbrt ~ 58 -> default ceiling 50
        assert_eq!(choose_worker_count(200_000, DEFAULT_MAX_WORKERS), 50);
    }

    #[test]
    fn resolve_defaults_and_rejects_zero() {
        assert_eq!(resolve_max_workers(None).unwrap(), DEFAULT_MAX_WORKERS);
        assert_eq!(resolve_max_workers(Some(8)).unwrap(), 8);
        assert!(matches!(resolve_max_workers(Some(0)), Err(ConfigError::InvalidWorkerCount(0))));
    }
}
