//! SQL schema for the Leadform SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS tenants (
    tenant_id     TEXT PRIMARY KEY,
    company_name  TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    sms_credits   INTEGER NOT NULL DEFAULT 0,
    settings_json TEXT NOT NULL       -- TenantSettings
);

-- One form per tenant, stored whole. Saves are last-write-wins.
CREATE TABLE IF NOT EXISTS form_definitions (
    tenant_id       TEXT PRIMARY KEY REFERENCES tenants(tenant_id),
    definition_json TEXT NOT NULL,    -- FormDefinition, blocks in order
    updated_at      TEXT NOT NULL
);

-- Only `status` is ever updated.
CREATE TABLE IF NOT EXISTS submissions (
    submission_id   TEXT PRIMARY KEY,
    tenant_id       TEXT NOT NULL REFERENCES tenants(tenant_id),
    ticket_number   TEXT NOT NULL,    -- display token, not unique
    phone           TEXT NOT NULL,
    created_at      TEXT NOT NULL,    -- RFC 3339 UTC, nanoseconds
    answers_json    TEXT NOT NULL,    -- ordered Answer list
    marketing_optin INTEGER NOT NULL DEFAULT 0,
    status          TEXT NOT NULL DEFAULT 'new'
);

CREATE TABLE IF NOT EXISTS call_logs (
    call_log_id TEXT PRIMARY KEY,
    tenant_id   TEXT NOT NULL REFERENCES tenants(tenant_id),
    phone       TEXT NOT NULL,
    message     TEXT NOT NULL,
    status      TEXT NOT NULL,        -- 'sent' | 'filtered' | 'error'
    reason      TEXT NOT NULL,
    call_id     TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS submissions_tenant_idx ON submissions(tenant_id, created_at);
CREATE INDEX IF NOT EXISTS submissions_ticket_idx ON submissions(ticket_number);
CREATE INDEX IF NOT EXISTS call_logs_tenant_idx   ON call_logs(tenant_id, created_at);

PRAGMA user_version = 1;
";
