//! User profile storage.
//!
//! A profile row is created lazily by the first field write. Only the fitness
//! level feeds back into the service; the other fields are informational.

use sqlx::SqlitePool;

use crate::models::UserProfile;
use crate::Result;

/// A settable profile field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    DisplayName,
    Timezone,
    /// Drives the synthesizer's subject parameters.
    FitnessLevel,
}

impl ProfileField {
    pub const ALL: [ProfileField; 3] = [
        ProfileField::DisplayName,
        ProfileField::Timezone,
        ProfileField::FitnessLevel,
    ];

    /// Canonical name, as accepted by [`ProfileField::parse`].
    pub fn name(self) -> &'static str {
        match self {
            ProfileField::DisplayName => "display_name",
            ProfileField::Timezone => "timezone",
            ProfileField::FitnessLevel => "fitness_level",
        }
    }

    /// Accepts the canonical name or a short alias, case-insensitively.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim().to_lowercase();
        Self::ALL.into_iter().find(|field| {
            field.name() == input
                || matches!(
                    (field, input.as_str()),
                    (ProfileField::DisplayName, "name")
                        | (ProfileField::Timezone, "tz")
                        | (ProfileField::FitnessLevel, "fitness")
                )
        })
    }

    fn upsert_sql(self) -> &'static str {
        match self {
            ProfileField::DisplayName => {
                "INSERT INTO user_profiles (user_id, display_name) VALUES (?, ?)
                 ON CONFLICT(user_id) DO UPDATE SET
                     display_name = excluded.display_name, updated_at = datetime('now')"
            }
            ProfileField::Timezone => {
                "INSERT INTO user_profiles (user_id, timezone) VALUES (?, ?)
                 ON CONFLICT(user_id) DO UPDATE SET
                     timezone = excluded.timezone, updated_at = datetime('now')"
            }
            ProfileField::FitnessLevel => {
                "INSERT INTO user_profiles (user_id, fitness_level) VALUES (?, ?)
                 ON CONFLICT(user_id) DO UPDATE SET
                     fitness_level = excluded.fitness_level, updated_at = datetime('now')"
            }
        }
    }
}

pub async fn get_profile(pool: &SqlitePool, user_id: &str) -> Result<Option<UserProfile>> {
    let profile = sqlx::query_as::<_, UserProfile>(
        r#"
        SELECT user_id, display_name, timezone, fitness_level, created_at, updated_at
        FROM user_profiles
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(profile)
}

/// The stored fitness level, if the user has a profile and set one.
pub async fn get_fitness_level(pool: &SqlitePool, user_id: &str) -> Result<Option<String>> {
    let level: Option<Option<String>> =
        sqlx::query_scalar("SELECT fitness_level FROM user_profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    Ok(level.flatten())
}

/// Write one field, creating the profile on first write. `None` clears it.
pub async fn set_field(
    pool: &SqlitePool,
    user_id: &str,
    field: ProfileField,
    value: Option<&str>,
) -> Result<()> {
    sqlx::query(field.upsert_sql())
        .bind(user_id)
        .bind(value)
        .execute(pool)
        .await?;

    Ok(())
}
