//! Rate-limited geocoder wrapper.

use std::cell::RefCell;
use std::time::{Duration, Instant};

use log::debug;

use geosift_core::{GeoPoint, Geocoder, GeocodingError};

/// Enforces a minimum spacing between geocoder requests and a bounded retry
/// count for address resolution.
///
/// Continuous-use geocoding services allow at most one request per second;
/// the wrapper sleeps as needed before delegating to the inner geocoder.
/// Address resolution retries transient failures with a doubling delay up to
/// `max_attempts`; reverse geocoding is attempted once, because callers can
/// fall back to a coordinate-based name.
pub struct PacedGeocoder<G> {
    inner: G,
    min_interval: Duration,
    max_attempts: u32,
    last_request: RefCell<Option<Instant>>,
}

impl<G: Geocoder> PacedGeocoder<G> {
    /// Wraps a geocoder with the default 1 s spacing and 3 attempts.
    #[must_use]
    pub fn new(inner: G) -> Self {
        Self::with_policy(inner, Duration::from_secs(1), 3)
    }

    /// Wraps a geocoder with an explicit spacing and attempt limit.
    #[must_use]
    pub fn with_policy(inner: G, min_interval: Duration, max_attempts: u32) -> Self {
        Self {
            inner,
            min_interval,
            max_attempts: max_attempts.max(1),
            last_request: RefCell::new(None),
        }
    }

    fn pace(&self) {
        let mut last = self.last_request.borrow_mut();
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                std::thread::sleep(self.min_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

impl<G: Geocoder> Geocoder for PacedGeocoder<G> {
    fn resolve_address(&self, query: &str) -> Result<GeoPoint, GeocodingError> {
        let mut backoff = self.min_interval;
        for attempt in 1..=self.max_attempts {
            self.pace();
            match self.inner.resolve_address(query) {
                Ok(point) => return Ok(point),
                // A definitive no-match will not improve with retries.
                Err(GeocodingError::NoMatch(q)) => return Err(GeocodingError::NoMatch(q)),
                Err(err) if attempt < self.max_attempts => {
                    debug!("geocode attempt {attempt} failed ({err}); backing off");
                    std::thread::sleep(backoff);
                    backoff *= 2;
                }
                Err(_) => break,
            }
        }
        Err(GeocodingError::RetriesExhausted {
            attempts: self.max_attempts,
        })
    }

    fn reverse_geocode(&self, point: GeoPoint) -> Result<String, GeocodingError> {
        self.pace();
        self.inner.reverse_geocode(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FlakyGeocoder {
        calls: Cell<u32>,
        succeed_on: u32,
    }

    impl Geocoder for FlakyGeocoder {
        fn resolve_address(&self, _query: &str) -> Result<GeoPoint, GeocodingError> {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            if call >= self.succeed_on {
                Ok(GeoPoint::new(10.0, 20.0).unwrap())
            } else {
                Err(GeocodingError::Service("transient".into()))
            }
        }
        fn reverse_geocode(&self, _point: GeoPoint) -> Result<String, GeocodingError> {
            self.calls.set(self.calls.get() + 1);
            Err(GeocodingError::Timeout(10))
        }
    }

    fn paced(succeed_on: u32, max_attempts: u32) -> PacedGeocoder<FlakyGeocoder> {
        PacedGeocoder::with_policy(
            FlakyGeocoder {
                calls: Cell::new(0),
                succeed_on,
            },
            Duration::from_millis(1),
            max_attempts,
        )
    }

    #[test]
    fn test_retries_transient_failures() {
        let geocoder = paced(2, 3);
        let point = geocoder.resolve_address("Oslo").unwrap();
        assert_eq!(point, GeoPoint::new(10.0, 20.0).unwrap());
        assert_eq!(geocoder.inner.calls.get(), 2);
    }

    #[test]
    fn test_bounded_attempts() {
        let geocoder = paced(10, 3);
        let err = geocoder.resolve_address("Oslo").unwrap_err();
        assert!(matches!(err, GeocodingError::RetriesExhausted { attempts: 3 }));
        assert_eq!(geocoder.inner.calls.get(), 3);
    }

    #[test]
    fn test_no_match_is_not_retried() {
        struct NoMatch;
        impl Geocoder for NoMatch {
            fn resolve_address(&self, query: &str) -> Result<GeoPoint, GeocodingError> {
                Err(GeocodingError::NoMatch(query.to_string()))
            }
            fn reverse_geocode(&self, _point: GeoPoint) -> Result<String, GeocodingError> {
                unreachable!()
            }
        }

        let geocoder = PacedGeocoder::with_policy(NoMatch, Duration::from_millis(1), 3);
        assert!(matches!(
            geocoder.resolve_address("Atlantis"),
            Err(GeocodingError::NoMatch(_))
        ));
    }

    #[test]
    fn test_reverse_geocode_single_attempt() {
        let geocoder = paced(1, 3);
        let point = GeoPoint::new(1.0, 2.0).unwrap();
        assert!(geocoder.reverse_geocode(point).is_err());
        assert_eq!(geocoder.inner.calls.get(), 1);
    }

    #[test]
    fn test_requests_are_spaced() {
        let geocoder = PacedGeocoder::with_policy(
            FlakyGeocoder {
                calls: Cell::new(0),
                succeed_on: 1,
            },
            Duration::from_millis(30),
            1,
        );

        let start = Instant::now();
        let _ = geocoder.resolve_address("a");
        let _ = geocoder.resolve_address("b");
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
