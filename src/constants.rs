pub mod accounts {

    pub const SYSTEM_USER_EMAIL: &str = "ai@local";

    pub const SYSTEM_USER_NAME: &str = "AI";

    pub const ROLE_USER: &str = "user";

    pub const ROLE_SYSTEM: &str = "system";
}

pub mod threads {

    pub const STATUS_OPEN: &str = "open";

    pub const STATUS_LOCKED: &str = "locked";

    pub const STATUS_HIDDEN: &str = "hidden";

    pub const DEFAULT_TITLE: &str = "Untitled thread";

    pub const PUBLIC_TOKEN_LEN: usize = 24;
}

pub mod generation {

    pub const MODE_CONVERSATION: &str = "conversation";

    /// Prefix marking AI-authored posts in the timeline.
    pub const AI_POST_PREFIX: &str = "[AI digest]\n";

    pub const DEFAULT_RECENT_POSTS: u64 = 10;
}

pub mod reports {

    pub const TARGET_POST: &str = "post";

    pub const STATUS_OPEN: &str = "open";

    pub const DEFAULT_REASON: &str = "not specified";
}
