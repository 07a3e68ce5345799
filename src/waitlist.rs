//! Early-access waitlist backed by a JSON file.
//!
//! The file holds a pretty-printed JSON array of lowercase email addresses.
//! A missing or corrupt file reads as an empty list rather than an error, so
//! a damaged file never takes the signup form down.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

const WAITLIST_FILE: &str = "waitlist.json";
const MAX_EMAIL_LENGTH: usize = 254;
const MAX_LOCAL_PART_LENGTH: usize = 64;

#[derive(Debug, Error)]
pub enum WaitlistError {
    #[error("Invalid email address: {0}")]
    InvalidEmail(&'static str),

    #[error("Failed to write waitlist: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize waitlist: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result of a signup attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Added,
    AlreadyListed,
}

#[derive(Debug)]
pub struct Waitlist {
    path: PathBuf,
    /// Serializes load-modify-save cycles within this process
    write_lock: Mutex<()>,
}

impl Waitlist {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(WAITLIST_FILE),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the current list. Unreadable or malformed files yield an empty list.
    pub async fn load(&self) -> Vec<String> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read waitlist");
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<String>>(&bytes) {
            Ok(emails) => emails,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Waitlist file is not a JSON string array, treating as empty");
                Vec::new()
            }
        }
    }

    pub async fn count(&self) -> usize {
        self.load().await.len()
    }

    /// Adds `email` to the list unless it is already present.
    ///
    /// The address is validated and lowercased first; duplicates are
    /// detected on the lowercased form.
    ///
    /// # Errors
    ///
    /// [`WaitlistError::InvalidEmail`] for malformed addresses, or an I/O
    /// error if the updated list cannot be persisted.
    pub async fn join(&self, email: &str) -> Result<JoinOutcome, WaitlistError> {
        let email = normalize_email(email)?;

        let _guard = self.write_lock.lock().await;
        let mut emails = self.load().await;
        if emails.contains(&email) {
            return Ok(JoinOutcome::AlreadyListed);
        }

        emails.push(email);
        self.save(&emails).await?;
        tracing::info!(total = emails.len(), "Waitlist signup recorded");
        Ok(JoinOutcome::Added)
    }

    /// Write-to-temp-then-rename so readers never see a partial file.
    async fn save(&self, emails: &[String]) -> Result<(), WaitlistError> {
        let bytes = serde_json::to_vec_pretty(emails)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

/// Validates an email address and returns its lowercase form.
pub fn normalize_email(raw: &str) -> Result<String, WaitlistError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(WaitlistError::InvalidEmail("empty"));
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(WaitlistError::InvalidEmail("too long"));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(WaitlistError::InvalidEmail("contains whitespace"));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or(WaitlistError::InvalidEmail("missing @"))?;
    if domain.contains('@') {
        return Err(WaitlistError::InvalidEmail("more than one @"));
    }

    validate_local_part(local)?;
    validate_domain(domain)?;

    Ok(email.to_lowercase())
}

fn validate_local_part(local: &str) -> Result<(), WaitlistError> {
    if local.is_empty() || local.len() > MAX_LOCAL_PART_LENGTH {
        return Err(WaitlistError::InvalidEmail("bad local part length"));
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return Err(WaitlistError::InvalidEmail("misplaced dot in local part"));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~.-".contains(c);
    if !local.chars().all(allowed) {
        return Err(WaitlistError::InvalidEmail("invalid character in local part"));
    }
    Ok(())
}

fn validate_domain(domain: &str) -> Result<(), WaitlistError> {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(WaitlistError::InvalidEmail("domain needs a dot"));
    }
    for label in &labels {
        let valid = !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_alphanumeric() || c == '-');
        if !valid {
            return Err(WaitlistError::InvalidEmail("invalid domain"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sentinel_waitlist_{name}_{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("User@Example.COM").unwrap(), "user@example.com");
        assert_eq!(normalize_email("  a.b+tag@sub.example.org ").unwrap(), "a.b+tag@sub.example.org");
    }

    #[test]
    fn test_invalid_emails_rejected() {
        for bad in [
            "",
            "plainaddress",
            "@example.com",
            "user@",
            "user@localhost",
            "user@@example.com",
            "a@b@example.com",
            "user name@example.com",
            ".user@example.com",
            "us..er@example.com",
            "user@-example.com",
            "user@example..com",
            "user@exa_mple.com",
        ] {
            assert!(normalize_email(bad).is_err(), "expected {bad:?} to be rejected");
        }
    }

    #[tokio::test]
    async fn test_join_then_duplicate() {
        let dir = temp_dir("dup");
        let waitlist = Waitlist::new(&dir);

        assert_eq!(waitlist.join("First@Example.com").await.unwrap(), JoinOutcome::Added);
        assert_eq!(
            waitlist.join("first@example.COM").await.unwrap(),
            JoinOutcome::AlreadyListed
        );
        assert_eq!(waitlist.join("second@example.com").await.unwrap(), JoinOutcome::Added);

        assert_eq!(
            waitlist.load().await,
            vec!["first@example.com".to_string(), "second@example.com".to_string()]
        );
        assert!(!waitlist.path().with_extension("json.tmp").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_persists_across_instances() {
        let dir = temp_dir("persist");
        Waitlist::new(&dir).join("keep@example.com").await.unwrap();

        let reopened = Waitlist::new(&dir);
        assert_eq!(reopened.count().await, 1);
        assert_eq!(
            reopened.join("keep@example.com").await.unwrap(),
            JoinOutcome::AlreadyListed
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_corrupt_file_treated_as_empty() {
        let dir = temp_dir("corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(WAITLIST_FILE), b"{ this is not json ").unwrap();

        let waitlist = Waitlist::new(&dir);
        assert_eq!(waitlist.count().await, 0);
        assert_eq!(waitlist.join("new@example.com").await.unwrap(), JoinOutcome::Added);
        assert_eq!(waitlist.load().await, vec!["new@example.com".to_string()]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_non_array_file_treated_as_empty() {
        let dir = temp_dir("object");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(WAITLIST_FILE), br#"{"emails": ["a@b.co"]}"#).unwrap();

        assert_eq!(Waitlist::new(&dir).count().await, 0);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_invalid_email_not_written() {
        let dir = temp_dir("invalid");
        let waitlist = Waitlist::new(&dir);

        let err = waitlist.join("nope").await.unwrap_err();
        assert!(matches!(err, WaitlistError::InvalidEmail(_)));
        assert!(!waitlist.path().exists());
    }

    #[tokio::test]
    async fn test_concurrent_joins_all_recorded() {
        let dir = temp_dir("concurrent");
        let waitlist = std::sync::Arc::new(Waitlist::new(&dir));

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let waitlist = waitlist.clone();
                tokio::spawn(async move { waitlist.join(&format!("user{i}@example.com")).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), JoinOutcome::Added);
        }

        assert_eq!(waitlist.count().await, 10);
        std::fs::remove_dir_all(&dir).ok();
    }
}
