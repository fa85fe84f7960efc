//! Shared UI icons.

use console::Emoji;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "[T]");
pub static TRIKE: Emoji<'_, '_> = Emoji("🛺 ", "[D]");
pub static SIGNAL: Emoji<'_, '_> = Emoji("📡 ", "[RT]");
