use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        VoxError::input("x")
            .to_string()
            .contains("input validation error:")
    );
    assert!(
        VoxError::upload("x")
            .to_string()
            .contains("upload storage error:")
    );
    assert!(VoxError::synthesis("x").to_string().contains("synthesis error:"));
    assert!(VoxError::transform("x").to_string().contains("transform error:"));
    assert!(VoxError::encode("x").to_string().contains("encode error:"));
    assert!(VoxError::cleanup("x").to_string().contains("cleanup error:"));
    assert!(VoxError::config("x").to_string().contains("config error:"));
}

#[test]
fn kinds_match_variants() {
    assert_eq!(VoxError::input("x").kind(), ErrorKind::InputValidation);
    assert_eq!(VoxError::synthesis("x").kind(), ErrorKind::Synthesis);
    assert_eq!(VoxError::encode("x").kind(), ErrorKind::Encode);
    assert_eq!(
        VoxError::Other(anyhow::anyhow!("glue")).kind(),
        ErrorKind::Internal
    );
    assert!(VoxError::input("x").is_caller_error());
    assert!(!VoxError::transform("x").is_caller_error());
}

#[test]
fn kind_serializes_snake_case() {
    let s = serde_json::to_string(&ErrorKind::UploadStorage).unwrap();
    assert_eq!(s, "\"upload_storage\"");
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = VoxError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
