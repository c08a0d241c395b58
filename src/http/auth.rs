// src/http/auth.rs

//! Injects a bypass credential (header or cookie) into every request.

use async_trait::async_trait;
use reqwest::header::{COOKIE, HeaderName, HeaderValue};

use super::{ApiRequest, ApiResponse, Middleware, Next};
use crate::error::{AppError, Result};
use crate::models::{BypassConfig, BypassKind};

#[derive(Debug, Clone)]
pub enum AuthBypass {
    Header { name: HeaderName, value: HeaderValue },
    Cookie { pair: String },
}

impl AuthBypass {
    pub fn from_config(config: &BypassConfig) -> Result<Self> {
        match config.kind {
            BypassKind::Header => {
                let name = HeaderName::from_bytes(config.name.as_bytes()).map_err(|e| {
                    AppError::config(format!("invalid bypass header '{}': {}", config.name, e))
                })?;
                let value = HeaderValue::from_str(&config.value)
                    .map_err(|e| AppError::config(format!("invalid bypass value: {e}")))?;
                Ok(Self::Header { name, value })
            }
            BypassKind::Cookie => Ok(Self::Cookie {
                pair: format!("{}={}", config.name, config.value),
            }),
        }
    }

    fn apply(&self, request: &mut ApiRequest) -> Result<()> {
        match self {
            Self::Header { name, value } => {
                request.headers.insert(name.clone(), value.clone());
            }
            Self::Cookie { pair } => {
                let cookie = match request.headers.get(COOKIE).and_then(|v| v.to_str().ok()) {
                    Some(existing) if !existing.is_empty() => format!("{existing}; {pair}"),
                    _ => pair.clone(),
                };
                let value = HeaderValue::from_str(&cookie)
                    .map_err(|e| AppError::config(format!("invalid bypass cookie: {e}")))?;
                request.headers.insert(COOKIE, value);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Middleware for AuthBypass {
    async fn handle(&self, mut request: ApiRequest, next: Next<'_>) -> Result<ApiResponse> {
        self.apply(&mut request)?;
        next.run(request).await
    }
}
