pub struct Icons;

impl Icons {
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const INFO: &str = "ℹ️";
    pub const SEARCH: &str = "🔍";
    pub const DATABASE: &str = "🗄️";
    pub const SCHEMA: &str = "📐";
    pub const KEY: &str = "🔑";
    pub const LOCK: &str = "🔒";
    pub const PERSON: &str = "👤";
    pub const NEW: &str = "✨";
    pub const DEL: &str = "🗑️";
    pub const EMPTY: &str = "∅";
}
