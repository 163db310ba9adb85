use crate::{Candidate, Result};

/// A pure, thread-safe test applied to every candidate by the worker pool.
///
/// Implementations must be safe to call concurrently from all workers and
/// must not rely on call order: candidates reach workers in queue order, but
/// workers run in parallel.
///
/// Any `Fn(Candidate) -> bool` is a predicate. Wrap a
/// `Fn(Candidate) -> Result<bool>` in [`Fallible`] to report per-candidate
/// failures; the pool logs and skips those candidates.
///
/// # Example
/// ```
/// use primeflow::{Predicate, is_prime};
///
/// assert_eq!(is_prime.evaluate(7), Ok(true));
/// assert_eq!((|n: i64| n % 2 == 0).evaluate(7), Ok(false));
/// ```
pub trait Predicate: Send + Sync + 'static {
    /// Returns whether `candidate` should be forwarded to the result stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Evaluation`](crate::Error::Evaluation) when the
    /// candidate cannot be evaluated. The candidate is skipped.
    fn evaluate(&self, candidate: Candidate) -> Result<bool>;
}

impl<F> Predicate for F
where
    F: Fn(Candidate) -> bool + Send + Sync + 'static,
{
    fn evaluate(&self, candidate: Candidate) -> Result<bool> {
        Ok(self(candidate))
    }
}

/// Adapter for predicates that can fail on individual candidates.
#[derive(Clone, Copy, Debug)]
pub struct Fallible<F>(pub F);

impl<F> Predicate for Fallible<F>
where
    F: Fn(Candidate) -> Result<bool> + Send + Sync + 'static,
{
    fn evaluate(&self, candidate: Candidate) -> Result<bool> {
        (self.0)(candidate)
    }
}

/// Trial-division primality test.
///
/// Values below `2` (including all negatives) are not prime.
pub fn is_prime(n: Candidate) -> bool {
    if n < 2 {
        return false;
    }
    let mut i: Candidate = 2;
    // `i <= n / i` is `i * i <= n` without overflowing near `i64::MAX`.
    while i <= n / i {
        if n % i == 0 {
            return false;
        }
        i += 1;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn small_primes() {
        let primes: Vec<Candidate> = (0..30).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, [2, 3, 5, 7, 11, 13, 17, 19, 23, 29]);
    }

    #[test]
    fn non_positive_values_are_not_prime() {
        for n in [-7, -2, -1, 0, 1] {
            assert!(!is_prime(n), "{n} reported as prime");
        }
    }

    #[test]
    fn squares_of_primes_are_composite() {
        for p in [2, 3, 5, 7, 11, 101, 7919] {
            assert!(!is_prime(p * p));
        }
    }

    #[test]
    fn large_values_do_not_overflow() {
        assert!(is_prime(1_000_000_007));
        // 2^63 - 1 = 7^2 * 73 * 127 * 337 * 92737 * 649657
        assert!(!is_prime(i64::MAX));
    }

    #[test]
    fn closures_are_predicates() {
        let even = |n: Candidate| n % 2 == 0;
        assert_eq!(even.evaluate(4), Ok(true));
        assert_eq!(even.evaluate(5), Ok(false));
    }

    #[test]
    fn fallible_surfaces_errors() {
        let picky = Fallible(|n: Candidate| {
            if n == 3 {
                Err(Error::evaluation(n, "unlucky"))
            } else {
                Ok(n > 3)
            }
        });

        assert_eq!(picky.evaluate(2), Ok(false));
        assert_eq!(picky.evaluate(4), Ok(true));
        assert_eq!(
            picky.evaluate(3),
            Err(Error::Evaluation {
                candidate: 3,
                reason: "unlucky".to_string()
            })
        );
    }
}
