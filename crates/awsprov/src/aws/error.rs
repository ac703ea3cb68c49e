//! Classification of AWS SDK failures
//!
//! Decisions are made on the service error code (`.code()`), never on the
//! Debug text, except as a last resort for errors that lost their type on
//! the way up. Nothing here retries: a category only decides whether a
//! cleanup step may treat a missing resource as done, and which hint the
//! binaries print under a fatal error.

use aws_sdk_ec2::error::ProvideErrorMetadata;
use thiserror::Error;

/// What kind of failure an AWS call reported
#[derive(Debug, Error)]
pub enum AwsError {
    /// The resource is already gone, so a delete of it has nothing to do
    #[error("{code}: {message}")]
    NotFound { code: String, message: String },

    #[error("{code}: {message}")]
    AlreadyExists { code: String, message: String },

    /// Something still references the resource (EC2 `DependencyViolation`,
    /// IAM `DeleteConflict`)
    #[error("{code}: {message}")]
    InUse { code: String, message: String },

    #[error("AWS throttled the request: {message}")]
    Throttled { message: String },

    /// Anything else, with the code when the service sent one
    #[error("AWS call failed: {message}")]
    Other {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AwsError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, AwsError::AlreadyExists { .. })
    }

    /// The service error code, if the call returned one
    pub fn code(&self) -> Option<&str> {
        match self {
            AwsError::NotFound { code, .. }
            | AwsError::AlreadyExists { code, .. }
            | AwsError::InUse { code, .. } => Some(code),
            AwsError::Other { code, .. } => code.as_deref(),
            AwsError::Throttled { .. } => None,
        }
    }

    /// A one-line hint for the user, for the failures they can act on
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            AwsError::AlreadyExists { .. } => {
                Some("Something with this name already exists. Re-run with --clean to replace it.")
            }
            AwsError::InUse { .. } => {
                Some("Something still references this resource. Delete its dependents first and retry.")
            }
            AwsError::Throttled { .. } => Some("AWS is rate limiting this account. Wait a moment and retry."),
            AwsError::Other { code: Some(code), .. } => hint_for_code(code),
            _ => None,
        }
    }
}

/// Codes `classify_aws_error` or `hint_for_code` know about, for the
/// Debug-text fallback
const KNOWN_CODES: &[&str] = &[
    "InvalidVpcID.NotFound",
    "InvalidSubnetID.NotFound",
    "InvalidInternetGatewayID.NotFound",
    "InvalidRouteTableID.NotFound",
    "InvalidVpcEndpointId.NotFound",
    "InvalidInstanceID.NotFound",
    "InvalidGroup.NotFound",
    "InvalidKeyPair.NotFound",
    "InvalidAMIID.NotFound",
    "InvalidAMIID.Malformed",
    "NoSuchEntity",
    "InvalidGroup.Duplicate",
    "InvalidPermission.Duplicate",
    "RouteAlreadyExists",
    "EntityAlreadyExists",
    "DependencyViolation",
    "DeleteConflict",
    "RequestLimitExceeded",
    "ThrottlingException",
    "Throttling",
    "VpcLimitExceeded",
    "InsufficientInstanceCapacity",
    "UnauthorizedOperation",
    "AccessDenied",
];

/// Sort an error code and message into an [`AwsError`].
pub fn classify_aws_error(code: Option<&str>, message: Option<&str>) -> AwsError {
    let message = message.unwrap_or("no message").to_string();
    let Some(code) = code else {
        return AwsError::Other { code: None, message };
    };
    let owned = code.to_string();

    match code {
        // A missing key pair or image is a user mistake on create, not a
        // resource that is already gone
        "InvalidKeyPair.NotFound" | "InvalidAMIID.NotFound" => AwsError::Other {
            code: Some(owned),
            message,
        },
        "NoSuchEntity" => AwsError::NotFound {
            code: owned,
            message,
        },
        c if c.starts_with("Invalid") && c.ends_with(".NotFound") => AwsError::NotFound {
            code: owned,
            message,
        },
        "InvalidGroup.Duplicate"
        | "InvalidPermission.Duplicate"
        | "RouteAlreadyExists"
        | "EntityAlreadyExists" => AwsError::AlreadyExists {
            code: owned,
            message,
        },
        "DependencyViolation" | "DeleteConflict" => AwsError::InUse {
            code: owned,
            message,
        },
        "Throttling" | "ThrottlingException" | "RequestLimitExceeded" => {
            AwsError::Throttled { message }
        }
        _ => AwsError::Other {
            code: Some(owned),
            message,
        },
    }
}

/// Turn a "not found" SDK error into `Ok(None)`.
///
/// Cleanup paths use this so that removing something that is already gone
/// counts as success. Every other error is passed through untouched.
pub fn ignore_not_found<T, E>(result: Result<T, E>) -> Result<Option<T>, E>
where
    E: ProvideErrorMetadata,
{
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if classify_aws_error(e.code(), e.message()).is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Classify whatever ended a command.
///
/// Looks through the context chain for the SDK errors of the calls a user
/// can most plausibly fix, then falls back to spotting a known code in the
/// Debug text.
pub fn classify_anyhow_error(error: &anyhow::Error) -> AwsError {
    use aws_sdk_ec2::error::SdkError;
    use aws_sdk_ec2::operation as ec2_op;
    use aws_sdk_iam::operation as iam_op;

    macro_rules! classify_if {
        ($cause:expr, $($err:ty),+ $(,)?) => {
            $(
                if let Some(e) = $cause.downcast_ref::<SdkError<$err>>() {
                    return classify_aws_error(e.code(), e.message());
                }
            )+
        };
    }

    for cause in error.chain() {
        classify_if!(
            cause,
            ec2_op::run_instances::RunInstancesError,
            ec2_op::create_vpc::CreateVpcError,
            ec2_op::delete_vpc::DeleteVpcError,
            ec2_op::create_security_group::CreateSecurityGroupError,
            ec2_op::delete_security_group::DeleteSecurityGroupError,
            iam_op::create_role::CreateRoleError,
            iam_op::create_instance_profile::CreateInstanceProfileError,
            iam_op::delete_role::DeleteRoleError,
        );
    }

    let debug = format!("{error:?}");
    match code_in_debug_text(&debug) {
        Some(code) => classify_aws_error(Some(&code), Some(&error.to_string())),
        None => AwsError::Other {
            code: None,
            message: error.to_string(),
        },
    }
}

/// Find a known code, or failing that a `code: Some("...")` field, in the
/// Debug rendering of an error
fn code_in_debug_text(debug: &str) -> Option<String> {
    if let Some(code) = KNOWN_CODES.iter().find(|code| debug.contains(*code)) {
        return Some((*code).to_string());
    }

    const FIELD: &str = "code: Some(\"";
    let start = debug.find(FIELD)? + FIELD.len();
    let len = debug[start..].find('"')?;
    Some(debug[start..start + len].to_string())
}

fn hint_for_code(code: &str) -> Option<&'static str> {
    let hint = match code {
        "InvalidKeyPair.NotFound" => {
            "The key pair does not exist in this region. Check --key-name and --region."
        }
        "InvalidAMIID.NotFound" | "InvalidAMIID.Malformed" => {
            "The image ID is not usable in this region. Omit --image-id to use the latest Amazon Linux 2023."
        }
        "VpcLimitExceeded" => {
            "The region's VPC quota is used up. Delete unused VPCs or request a limit increase."
        }
        "InsufficientInstanceCapacity" | "Unsupported" => {
            "This instance type is not available here right now. Try another type or region."
        }
        "UnauthorizedOperation" | "AccessDenied" => {
            "The credentials in use lack permission for this call. Check --aws-profile."
        }
        _ => return None,
    };
    Some(hint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ec2_and_iam_missing_resources_are_not_found() {
        for code in [
            "InvalidVpcID.NotFound",
            "InvalidSubnetID.NotFound",
            "InvalidInternetGatewayID.NotFound",
            "InvalidVpcEndpointId.NotFound",
            "InvalidGroup.NotFound",
            "NoSuchEntity",
        ] {
            let err = classify_aws_error(Some(code), Some("gone"));
            assert!(err.is_not_found(), "{code} should be NotFound");
            assert_eq!(err.code(), Some(code));
        }
    }

    #[test]
    fn missing_key_pair_is_not_treated_as_already_gone() {
        let err = classify_aws_error(Some("InvalidKeyPair.NotFound"), Some("no key"));
        assert!(!err.is_not_found());
        assert!(err.suggestion().unwrap().contains("--key-name"));
    }

    #[test]
    fn duplicates_suggest_clean() {
        for code in ["InvalidGroup.Duplicate", "EntityAlreadyExists", "RouteAlreadyExists"] {
            let err = classify_aws_error(Some(code), Some("dup"));
            assert!(err.is_already_exists(), "{code} should be AlreadyExists");
            assert!(err.suggestion().unwrap().contains("--clean"));
        }
    }

    #[test]
    fn dependency_violation_and_delete_conflict_are_in_use() {
        let ec2 = classify_aws_error(Some("DependencyViolation"), Some("subnet in use"));
        assert!(matches!(ec2, AwsError::InUse { .. }));
        assert_eq!(ec2.to_string(), "DependencyViolation: subnet in use");

        let iam = classify_aws_error(Some("DeleteConflict"), Some("role has policies"));
        assert!(matches!(iam, AwsError::InUse { .. }));
    }

    #[test]
    fn throttling_has_no_code() {
        let err = classify_aws_error(Some("RequestLimitExceeded"), Some("slow down"));
        assert!(matches!(err, AwsError::Throttled { .. }));
        assert_eq!(err.code(), None);
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn unknown_code_is_kept() {
        let err = classify_aws_error(Some("SomethingNew"), Some("details"));
        assert_eq!(err.code(), Some("SomethingNew"));
        assert!(err.suggestion().is_none());

        let bare = classify_aws_error(None, None);
        assert_eq!(bare.to_string(), "AWS call failed: no message");
    }

    #[test]
    fn debug_text_code_field_is_extracted() {
        let debug = r#"ServiceError { code: Some("OptInRequired"), message: "x" }"#;
        assert_eq!(code_in_debug_text(debug).as_deref(), Some("OptInRequired"));
        assert!(code_in_debug_text("connection refused").is_none());
    }

    #[test]
    fn anyhow_error_classified_from_text() {
        let err = anyhow::anyhow!("run instances: InvalidKeyPair.NotFound: key 'x' missing");
        assert_eq!(classify_anyhow_error(&err).code(), Some("InvalidKeyPair.NotFound"));

        let plain = anyhow::anyhow!("connection refused");
        assert!(matches!(
            classify_anyhow_error(&plain),
            AwsError::Other { code: None, .. }
        ));
    }
}
