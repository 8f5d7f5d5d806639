use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Identity not found for email address: {0}")]
    IdentityNotFound(String),

    #[error("Malformed ACL document: {0}")]
    MalformedAclXml(String),

    #[error("Unknown group or permission: {0}")]
    UnknownGroupOrPermission(String),

    #[error("The owner's FULL_CONTROL grant cannot be removed")]
    OwnerGrantImmutable,

    #[error("Too many grants: {count} exceeds the limit of {max}")]
    TooManyGrants { count: usize, max: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Access denied")]
    AccessDenied,

    #[error("Bucket not found")]
    NoSuchBucket,

    #[error("Object not found")]
    NoSuchKey,

    #[error("Bucket already exists")]
    BucketAlreadyExists,

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::MalformedAclXml(err.to_string())
    }
}

impl Error {
    /// True for every error raised while reading an ACL document.
    pub fn is_malformed_acl(&self) -> bool {
        matches!(
            self,
            Error::MalformedAclXml(_)
                | Error::UnknownGroupOrPermission(_)
                | Error::TooManyGrants { .. }
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::IdentityNotFound(_) => StatusCode::BAD_REQUEST,
            Error::MalformedAclXml(_) => StatusCode::BAD_REQUEST,
            Error::UnknownGroupOrPermission(_) => StatusCode::BAD_REQUEST,
            Error::OwnerGrantImmutable => StatusCode::BAD_REQUEST,
            Error::TooManyGrants { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Error::AccessDenied => StatusCode::FORBIDDEN,
            Error::NoSuchBucket => StatusCode::NOT_FOUND,
            Error::NoSuchKey => StatusCode::NOT_FOUND,
            Error::BucketAlreadyExists => StatusCode::CONFLICT,
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &str {
        match self {
            Error::IdentityNotFound(_) => "UnresolvableGrantByEmailAddress",
            Error::MalformedAclXml(_) => "MalformedACLError",
            Error::UnknownGroupOrPermission(_) => "MalformedACLError",
            Error::TooManyGrants { .. } => "MalformedACLError",
            Error::OwnerGrantImmutable => "InvalidArgument",
            Error::InvalidArgument(_) => "InvalidArgument",
            Error::AccessDenied => "AccessDenied",
            Error::NoSuchBucket => "NoSuchBucket",
            Error::NoSuchKey => "NoSuchKey",
            Error::BucketAlreadyExists => "BucketAlreadyExists",
            Error::Other(_) => "InternalError",
        }
    }

    pub fn to_xml(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
    <Code>{}</Code>
    <Message>{}</Message>
    <Resource></Resource>
    <RequestId>{}</RequestId>
</Error>"#,
            self.error_code(),
            quick_xml::escape::escape(self.to_string().as_str()),
            uuid::Uuid::new_v4()
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_xml();

        (status, [(header::CONTENT_TYPE, "application/xml")], body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acl_errors_map_to_malformed_acl_code() {
        let errors = [
            Error::MalformedAclXml("missing <Owner>".to_string()),
            Error::UnknownGroupOrPermission("READ_ALL".to_string()),
            Error::TooManyGrants { count: 101, max: 100 },
        ];

        for err in errors {
            assert!(err.is_malformed_acl());
            assert_eq!(err.error_code(), "MalformedACLError");
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_identity_and_owner_errors() {
        let err = Error::IdentityNotFound("nobody@example.com".to_string());
        assert_eq!(err.error_code(), "UnresolvableGrantByEmailAddress");
        assert!(!err.is_malformed_acl());

        assert_eq!(Error::OwnerGrantImmutable.error_code(), "InvalidArgument");
        assert_eq!(Error::AccessDenied.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_internal_errors_are_500() {
        let err: Error = anyhow::anyhow!("store unavailable").into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "InternalError");
        assert!(!err.is_malformed_acl());
    }

    #[test]
    fn test_error_xml_escapes_message() {
        let xml = Error::MalformedAclXml("unexpected <Foo>".to_string()).to_xml();
        assert!(xml.contains("<Code>MalformedACLError</Code>"));
        assert!(xml.contains("unexpected &lt;Foo&gt;"));
    }
}
