/// Cache tables. `networks.organization_id` is informational and carries no
/// foreign key constraint.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS organizations (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    country TEXT,
    created TEXT
);

CREATE INDEX IF NOT EXISTS idx_organizations_name ON organizations(name);

CREATE TABLE IF NOT EXISTS networks (
    inetnum TEXT PRIMARY KEY NOT NULL,
    netname TEXT NOT NULL,
    country TEXT,
    organization_id TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_networks_organization ON networks(organization_id);
"#;
