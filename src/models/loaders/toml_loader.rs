use crate::error::{AppError, FileError};
use crate::models::profile::ApplicantProfile;
use anyhow::Result;
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载申请人资料
pub async fn load_profile(toml_file_path: &Path) -> Result<ApplicantProfile> {
    let path = toml_file_path.display().to_string();
    if !toml_file_path.exists() {
        return Err(AppError::File(FileError::NotFound { path }).into());
    }

    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| AppError::file_read_failed(path.clone(), e))?;

    let profile: ApplicantProfile = toml::from_str(&content).map_err(|e| {
        AppError::File(FileError::TomlParseFailed {
            path,
            source: Box::new(e),
        })
    })?;

    tracing::info!(
        "成功加载申请人资料: {} ({} 项技能, {} 种语言)",
        profile.full_name(),
        profile.skills.len(),
        profile.languages.len()
    );

    Ok(profile)
}

/// 解析 TOML 文本为申请人资料
pub fn parse_profile(content: &str) -> Result<ApplicantProfile> {
    let profile: ApplicantProfile = toml::from_str(content)?;
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profile() {
        let content = r#"
firstName = "Ada"
lastName = "Lovelace"
email = "ada@example.com"
phone = "+44 20 0000 0000"
location = "London"
skills = ["rust", "tokio"]
workAuthorized = true

[[languages]]
name = "English"
level = "Native or bilingual"

[[experience]]
title = "Engineer"
company = "Analytical Engines"
years = 4
"#;
        let profile = parse_profile(content).unwrap();
        assert_eq!(profile.full_name(), "Ada Lovelace");
        assert_eq!(profile.skills, vec!["rust", "tokio"]);
        assert!(profile.work_authorized);
        assert!(!profile.needs_sponsorship);
        assert_eq!(profile.total_years_experience(), 4);
    }

    #[tokio::test]
    async fn test_load_profile_missing_file() {
        let err = load_profile(Path::new("does/not/exist.toml")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::File(FileError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_load_profile_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.toml");
        std::fs::write(&path, "firstName = [unterminated").unwrap();

        let err = load_profile(&path).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::File(FileError::TomlParseFailed { .. }))
        ));
    }
}
