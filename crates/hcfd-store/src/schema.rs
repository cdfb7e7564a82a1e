//! Table layout for persisted sets
//!
//! Every named set (`user`, `token0`, `token1`) lives in one table keyed by
//! `(set_name, member)`, so insert-if-absent is a single atomic statement.

pub const CREATE_SETS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS hcfd_sets (
    set_name VARCHAR(64) NOT NULL,
    member VARCHAR(255) NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (set_name, member)
)
"#;
