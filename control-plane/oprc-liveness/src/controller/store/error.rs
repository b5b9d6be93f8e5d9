pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("kubernetes api error: {0}")]
    Api(#[source] kube::Error),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Classify an API server response: 404 and 409 become the benign
    /// variants, everything else stays a retryable API error.
    pub fn from_kube(err: kube::Error) -> Self {
        match &err {
            kube::Error::Api(resp) if resp.code == 404 => {
                StoreError::NotFound(resp.message.clone())
            }
            kube::Error::Api(resp) if resp.code == 409 => {
                StoreError::Conflict(resp.message.clone())
            }
            _ => StoreError::Api(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}
