//! # Password Engine
//!
//! Strength validation, bcrypt hashing, and change-password similarity
//! checks.
//!
//! ## Strength Model
//!
//! A password is scored 0-4 and checked against hard requirements. The
//! two are separate: requirements gate acceptance outright, the score
//! adds a quality bar on top.
//!
//! | Requirement | Rejected when |
//! |-------------|---------------|
//! | Length ≥ 8 | shorter |
//! | ≥ 1 uppercase | none present |
//! | ≥ 1 lowercase | none present |
//! | ≥ 1 digit | none present |
//! | ≥ 1 symbol | none from the defined set |
//! | No compromised pattern | contains a known-leaked token (case-insensitive) |
//! | No triple-repeat run | any `aaa`-style run |
//!
//! Acceptance = all requirements met **and** score ≥ 3.
//!
//! ## Hashing
//!
//! bcrypt with a configurable cost factor (default 12). Verification is
//! constant-time inside the bcrypt crate. Each hash embeds its own random
//! salt, so equal passwords produce different hashes.
//!
//! ## Similarity
//!
//! `change` flows reject a new password that is more than 70% similar
//! (normalized Levenshtein) to the account's identifying strings. The old
//! password only exists as a hash, so identifiers are the reference.
//!
//! ## Error Model
//!
//! Strength and similarity checks never fail for user-input reasons -
//! they return structured reports. Only hashing itself can error, and
//! only for infrastructure-class reasons.

use crate::errors::ApiError;

// =============================================================================
// Constants
// =============================================================================

/// Symbols that satisfy the special-character requirement.
const SYMBOLS: &str = "!@#$%^&*()-_=+[]{};:'\",.<>/?\\|`~";

/// Substrings that mark a password as compromised, matched
/// case-insensitively anywhere in the input.
const COMPROMISED_PATTERNS: &[&str] = &[
    "password", "123456", "qwerty", "letmein", "abc123", "welcome", "iloveyou", "admin",
    "dragon", "monkey",
];

/// Similarity above this threshold rejects a new password.
const SIMILARITY_THRESHOLD: f64 = 0.7;

// =============================================================================
// Strength Report
// =============================================================================

/// Outcome of a strength check.
///
/// `ok` is the acceptance verdict; `score` and `feedback` exist so the
/// client can show the user what to fix. Never an error - weak input is a
/// report, not an exception.
#[derive(Debug, Clone)]
pub struct StrengthReport {
    /// Whether the password is acceptable
    pub ok: bool,

    /// Quality score, 0-4
    pub score: u8,

    /// One entry per failed requirement or quality hint
    pub feedback: Vec<String>,
}

/// Strength validation for new passwords.
pub struct PasswordStrength;

impl PasswordStrength {
    /// Checks a candidate password against requirements and scores it.
    ///
    /// Acceptance requires every hard requirement **and** a score of at
    /// least 3.
    pub fn check(password: &str) -> StrengthReport {
        let mut feedback = Vec::new();

        let long_enough = password.len() >= 8;
        if !long_enough {
            feedback.push("Password must be at least 8 characters long".to_string());
        }

        let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
        if !has_upper {
            feedback.push("Password must contain at least one uppercase letter".to_string());
        }

        let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
        if !has_lower {
            feedback.push("Password must contain at least one lowercase letter".to_string());
        }

        let has_digit = password.chars().any(|c| c.is_ascii_digit());
        if !has_digit {
            feedback.push("Password must contain at least one digit".to_string());
        }

        let has_symbol = password.chars().any(|c| SYMBOLS.contains(c));
        if !has_symbol {
            feedback.push("Password must contain at least one special character".to_string());
        }

        let compromised = Self::contains_compromised_pattern(password);
        if compromised {
            feedback.push("Password contains a commonly breached pattern".to_string());
        }

        let repeated = Self::has_triple_run(password);
        if repeated {
            feedback.push("Password must not repeat the same character three times in a row"
                .to_string());
        }

        let requirements_met = long_enough
            && has_upper
            && has_lower
            && has_digit
            && has_symbol
            && !compromised
            && !repeated;

        // Score: one point each for baseline length, full character
        // variety, extended length, and a clean pattern check
        let mut score: u8 = 0;
        if long_enough {
            score += 1;
        }
        if has_upper && has_lower && has_digit && has_symbol {
            score += 1;
        }
        if password.len() >= 12 {
            score += 1;
        }
        if !compromised && !repeated {
            score += 1;
        }

        let ok = requirements_met && score >= 3;
        if requirements_met && !ok {
            feedback.push("Use a longer passphrase to strengthen the password".to_string());
        }

        StrengthReport { ok, score, feedback }
    }

    /// Case-insensitive substring search over the compromised list.
    fn contains_compromised_pattern(password: &str) -> bool {
        let lowered = password.to_lowercase();
        COMPROMISED_PATTERNS
            .iter()
            .any(|pattern| lowered.contains(pattern))
    }

    /// True when any character occurs three or more times consecutively.
    fn has_triple_run(password: &str) -> bool {
        let chars: Vec<char> = password.chars().collect();
        chars.windows(3).any(|w| w[0] == w[1] && w[1] == w[2])
    }

    /// Whether `candidate` is too close to `reference` to be accepted as a
    /// replacement (normalized Levenshtein similarity above 0.7).
    pub fn too_similar(candidate: &str, reference: &str) -> bool {
        if reference.is_empty() {
            return false;
        }
        strsim::normalized_levenshtein(&candidate.to_lowercase(), &reference.to_lowercase())
            > SIMILARITY_THRESHOLD
    }
}

// =============================================================================
// Password Hasher
// =============================================================================

/// bcrypt password hashing service.
///
/// ## Thread Safety
///
/// `Clone + Send + Sync`; each hash operation generates a new random
/// salt internally.
#[derive(Clone)]
pub struct PasswordHasher {
    /// bcrypt cost factor
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(12)
    }
}

impl PasswordHasher {
    /// Creates a hasher with the given bcrypt cost factor.
    ///
    /// Cost 12 keeps verification around 250 ms on current hardware;
    /// tests use the bcrypt minimum to stay fast.
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hashes a password for storage.
    ///
    /// ## Errors
    ///
    /// Returns `ApiError::InternalError` if hashing fails (rare).
    pub fn hash(&self, password: &str) -> Result<String, ApiError> {
        bcrypt::hash(password, self.cost).map_err(|e| ApiError::InternalError {
            message: format!("Password hashing failed: {}", e),
        })
    }

    /// Verifies a password against a stored hash in constant time.
    ///
    /// ## Returns
    ///
    /// - `Ok(true)` - Password matches
    /// - `Ok(false)` - Password doesn't match
    /// - `Err(...)` - Stored hash is malformed
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, ApiError> {
        bcrypt::verify(password, hash).map_err(|e| ApiError::InternalError {
            message: format!("Password verification failed: {}", e),
        })
    }
}

// Implement Debug manually to avoid exposing internal state
impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher").finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// bcrypt minimum cost, to keep the test suite fast.
    fn test_hasher() -> PasswordHasher {
        PasswordHasher::new(4)
    }

    #[test]
    fn test_hash_and_verify_correct_password() {
        let hasher = test_hasher();
        let password = "MySecure#Pw9";

        let hash = hasher.hash(password).unwrap();

        assert_ne!(hash, password);
        assert!(hasher.verify(password, &hash).unwrap());
    }

    #[test]
    fn test_verify_wrong_password() {
        let hasher = test_hasher();
        let hash = hasher.hash("MySecure#Pw9").unwrap();

        assert!(!hasher.verify("WrongGuess#1", &hash).unwrap());
    }

    #[test]
    fn test_different_hashes_for_same_password() {
        let hasher = test_hasher();
        let password = "MySecure#Pw9";

        let hash1 = hasher.hash(password).unwrap();
        let hash2 = hasher.hash(password).unwrap();

        // Each hash embeds a fresh salt
        assert_ne!(hash1, hash2);
        assert!(hasher.verify(password, &hash1).unwrap());
        assert!(hasher.verify(password, &hash2).unwrap());
    }

    #[test]
    fn test_hash_is_bcrypt_format() {
        let hash = test_hasher().hash("MySecure#Pw9").unwrap();
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn test_minimal_acceptable_password() {
        // 8 chars, all four classes, clean: score 3, requirements met
        let report = PasswordStrength::check("Abcdef1!");
        assert!(report.ok, "feedback: {:?}", report.feedback);
        assert_eq!(report.score, 3);
    }

    #[test]
    fn test_strong_password_scores_four() {
        let report = PasswordStrength::check("Tr4verse!Meadow");
        assert!(report.ok);
        assert_eq!(report.score, 4);
    }

    #[test]
    fn test_too_short_rejected() {
        let report = PasswordStrength::check("Ab1!");
        assert!(!report.ok);
        assert!(report
            .feedback
            .iter()
            .any(|f| f.contains("at least 8 characters")));
    }

    #[test]
    fn test_missing_classes_rejected() {
        assert!(!PasswordStrength::check("abcdefg1!").ok); // no upper
        assert!(!PasswordStrength::check("ABCDEFG1!").ok); // no lower
        assert!(!PasswordStrength::check("Abcdefgh!").ok); // no digit
        assert!(!PasswordStrength::check("Abcdefg12").ok); // no symbol
    }

    #[test]
    fn test_compromised_pattern_rejected() {
        // Meets every character-class requirement but embeds "password"
        let report = PasswordStrength::check("MyPassword1!");
        assert!(!report.ok);
        assert!(report.feedback.iter().any(|f| f.contains("breached")));

        // Case-insensitive
        assert!(!PasswordStrength::check("QWERTY!2ab").ok);
    }

    #[test]
    fn test_triple_run_rejected() {
        let report = PasswordStrength::check("Baaacdef1!");
        assert!(!report.ok);
        assert!(report.feedback.iter().any(|f| f.contains("three times")));
    }

    #[test]
    fn test_similarity_threshold() {
        // Identical strings are maximally similar
        assert!(PasswordStrength::too_similar("alice@example.com", "alice@example.com"));
        // One-character edit on a long string stays above 0.7
        assert!(PasswordStrength::too_similar("alice@example.con", "alice@example.com"));
        // Unrelated strings fall well below
        assert!(!PasswordStrength::too_similar("Tr4verse!Meadow", "alice@example.com"));
        // Empty reference never blocks
        assert!(!PasswordStrength::too_similar("anything", ""));
    }
}
