//! Shared UI icons and emojis.
//!
//! Emoji constants used by the stage renderer, with plain-text fallbacks
//! for terminals without emoji support.

use console::Emoji;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[WARN]");
pub static HOURGLASS: Emoji<'_, '_> = Emoji("⏳ ", "[..]");
