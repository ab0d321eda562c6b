//! Validation utilities for the MBG nutrition monitor
//!
//! Domain checks applied by the backend before anything reaches storage.
//! The aggregator itself never validates; these keep its inputs sane.

use crate::nutrition::{NutrientProfile, PortionNutrition, Threshold};

// ============================================================================
// Nutrition Validations
// ============================================================================

/// Validate a single nutrient value (finite and not negative)
pub fn validate_nutrient_value(value: f64) -> Result<(), &'static str> {
    if !value.is_finite() {
        return Err("Nutrient value must be a finite number");
    }
    if value < 0.0 {
        return Err("Nutrient value cannot be negative");
    }
    Ok(())
}

/// Validate all five values of a profile
pub fn validate_nutrient_profile(profile: &NutrientProfile) -> Result<(), &'static str> {
    for (_, value) in profile.values() {
        validate_nutrient_value(value)?;
    }
    Ok(())
}

/// Validate the ten per-unit values of a catalog food
pub fn validate_portion_nutrition(nutrition: &PortionNutrition) -> Result<(), &'static str> {
    validate_nutrient_profile(&nutrition.large)?;
    validate_nutrient_profile(&nutrition.small)
}

/// Validate AKG targets
pub fn validate_threshold(threshold: &Threshold) -> Result<(), &'static str> {
    validate_nutrient_profile(&NutrientProfile::new(
        threshold.energy,
        threshold.protein,
        threshold.fat,
        threshold.fiber,
        threshold.carbohydrate,
    ))
}

/// Validate a serving quantity (finite and strictly positive)
pub fn validate_quantity(quantity: f64) -> Result<(), &'static str> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err("Quantity must be a positive number");
    }
    Ok(())
}

/// Validate a detection confidence score
pub fn validate_confidence(confidence: f64) -> Result<(), &'static str> {
    if !(0.0..=1.0).contains(&confidence) {
        return Err("Confidence must be between 0 and 1");
    }
    Ok(())
}

/// Validate the ML confidence threshold passed to the detector
pub fn validate_conf_threshold(conf: f64) -> Result<(), &'static str> {
    if !(conf > 0.0 && conf <= 1.0) {
        return Err("Confidence threshold must be greater than 0 and at most 1");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate a display name (food, menu, AKG record)
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name is required");
    }
    if trimmed.chars().count() > 255 {
        return Err("Name must be at most 255 characters");
    }
    Ok(())
}

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err("Invalid email format"),
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 6 {
        return Err("Password must be at least 6 characters");
    }
    Ok(())
}

/// Accepted upload content types
pub const IMAGE_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Validate an uploaded image content type
pub fn validate_image_content_type(content_type: &str) -> Result<(), &'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if IMAGE_CONTENT_TYPES.contains(&essence.as_str()) {
        Ok(())
    } else {
        Err("Only JPEG, PNG or WebP images are accepted")
    }
}

/// Validate an upload file name, which becomes part of the object key
pub fn validate_file_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("File name is required");
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err("File name cannot contain path separators");
    }
    Ok(())
}
