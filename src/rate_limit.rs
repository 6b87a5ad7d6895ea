/// Rate limiting
use crate::{
    config::RateLimitConfig,
    context::AppContext,
    error::{ClinicError, ClinicResult},
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

type DirectLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Process-wide request limiter
#[derive(Clone)]
pub struct RateLimiter {
    authenticated: Arc<DirectLimiter>,
    unauthenticated: Arc<DirectLimiter>,
}

fn non_zero(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).unwrap_or(NonZeroU32::MIN)
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let auth_quota = Quota::per_second(non_zero(config.authenticated_rps))
            .allow_burst(non_zero(config.burst_size));

        // Anonymous traffic (login, register) gets a fifth of the burst
        let unauth_quota = Quota::per_second(non_zero(config.unauthenticated_rps))
            .allow_burst(non_zero(config.burst_size / 5));

        Self {
            authenticated: Arc::new(GovernorLimiter::direct(auth_quota)),
            unauthenticated: Arc::new(GovernorLimiter::direct(unauth_quota)),
        }
    }

    /// Check rate limit for a request carrying a bearer token
    pub fn check_authenticated(&self) -> ClinicResult<()> {
        self.authenticated
            .check()
            .map_err(|_| ClinicError::RateLimitExceeded {
                retry_after: Duration::from_secs(1),
            })
    }

    /// Check rate limit for an anonymous request
    pub fn check_unauthenticated(&self) -> ClinicResult<()> {
        self.unauthenticated
            .check()
            .map_err(|_| ClinicError::RateLimitExceeded {
                retry_after: Duration::from_secs(1),
            })
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, ClinicError> {
    if !ctx.config.rate_limit.enabled {
        return Ok(next.run(request).await);
    }

    let has_auth_header = request.headers().get("authorization").is_some();

    if has_auth_header {
        ctx.rate_limiter.check_authenticated()?;
    } else {
        ctx.rate_limiter.check_unauthenticated()?;
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(&RateLimitConfig::default());

        assert!(limiter.check_authenticated().is_ok());
        assert!(limiter.check_unauthenticated().is_ok());
    }

    #[test]
    fn test_burst_limit() {
        let config = RateLimitConfig {
            enabled: true,
            authenticated_rps: 10,
            unauthenticated_rps: 5,
            burst_size: 5,
        };
        let limiter = RateLimiter::new(&config);

        for _ in 0..5 {
            assert!(limiter.check_authenticated().is_ok());
        }
        assert!(matches!(
            limiter.check_authenticated(),
            Err(ClinicError::RateLimitExceeded { .. })
        ));

        // burst 5 / 5 leaves a single anonymous request
        assert!(limiter.check_unauthenticated().is_ok());
        assert!(limiter.check_unauthenticated().is_err());
    }

    #[test]
    fn test_zero_quota_does_not_panic() {
        let config = RateLimitConfig {
            enabled: true,
            authenticated_rps: 0,
            unauthenticated_rps: 0,
            burst_size: 0,
        };
        let limiter = RateLimiter::new(&config);
        assert!(limiter.check_authenticated().is_ok());
    }
}
