//! Custom assertions shared across ciao test suites.

/// Assert that a string contains all expected substrings
#[macro_export]
macro_rules! assert_contains_all {
    ($haystack:expr, $($needle:expr),+ $(,)?) => {
        $(
            assert!(
                $haystack.contains($needle),
                "Expected '{}' to contain '{}', but it didn't",
                $haystack,
                $needle
            );
        )+
    };
}

/// Assert that a string does not contain any of the specified substrings
#[macro_export]
macro_rules! assert_contains_none {
    ($haystack:expr, $($needle:expr),+ $(,)?) => {
        $(
            assert!(
                !$haystack.contains($needle),
                "Expected '{}' to NOT contain '{}', but it did",
                $haystack,
                $needle
            );
        )+
    };
}

/// Assert that execution time is within expected bounds
#[macro_export]
macro_rules! assert_duration {
    ($duration:expr, < $max:expr) => {
        assert!(
            $duration < $max,
            "Expected duration {:?} to be less than {:?}",
            $duration,
            $max
        );
    };
    ($duration:expr, > $min:expr) => {
        assert!(
            $duration > $min,
            "Expected duration {:?} to be greater than {:?}",
            $duration,
            $min
        );
    };
}

/// Performance assertion utilities
pub mod performance {
    use std::time::{Duration, Instant};

    /// Assert that a closure completes within a time limit
    pub fn assert_completes_within<F>(duration: Duration, f: F)
    where
        F: FnOnce(),
    {
        let start = Instant::now();
        f();
        let elapsed = start.elapsed();
        assert!(
            elapsed <= duration,
            "Operation took {:?}, expected <= {:?}",
            elapsed,
            duration
        );
    }

    /// Async version of assert_completes_within
    pub async fn assert_completes_within_async<F, Fut>(duration: Duration, f: F)
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let start = Instant::now();
        f().await;
        let elapsed = start.elapsed();
        assert!(
            elapsed <= duration,
            "Async operation took {:?}, expected <= {:?}",
            elapsed,
            duration
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_contains_all() {
        let text = "The quick brown fox jumps over the lazy dog";
        assert_contains_all!(text, "quick", "fox", "dog");
    }

    #[test]
    fn test_assert_contains_none() {
        let text = "The quick brown fox";
        assert_contains_none!(text, "cat", "mouse", "elephant");
    }

    #[test]
    fn test_performance_assertion() {
        use std::time::Duration;
        performance::assert_completes_within(Duration::from_millis(100), || {
            // Fast operation
            let _x = 1 + 1;
        });
    }

    #[tokio::test]
    async fn test_async_performance_assertion() {
        use std::time::Duration;
        performance::assert_completes_within_async(Duration::from_millis(100), || async {
            // Fast async operation
            tokio::time::sleep(Duration::from_millis(10)).await;
        })
        .await;
    }

}
