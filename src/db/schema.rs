pub const SCHEMA: &str = r#"
-- articles table (mirrored from Notion, keyed by the page id)
CREATE TABLE IF NOT EXISTS articles (
    pk INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    slug TEXT NOT NULL,
    excerpt TEXT NOT NULL DEFAULT '',
    content TEXT,
    publish_date TEXT NOT NULL DEFAULT '',
    last_edited_time TEXT NOT NULL DEFAULT '',
    author TEXT NOT NULL DEFAULT '[]',
    topics TEXT NOT NULL DEFAULT '[]',
    why_it_matters TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL,
    cover_image TEXT,
    content_hash TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    synced_at INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_articles_slug ON articles(slug) WHERE slug != '';
CREATE INDEX IF NOT EXISTS idx_articles_publish_date ON articles(publish_date DESC);
CREATE INDEX IF NOT EXISTS idx_articles_status ON articles(status);

-- full-text index over the searchable columns
CREATE VIRTUAL TABLE IF NOT EXISTS articles_fts USING fts5(
    title,
    excerpt,
    why_it_matters,
    content='articles',
    content_rowid='pk'
);

CREATE TRIGGER IF NOT EXISTS articles_fts_insert AFTER INSERT ON articles BEGIN
    INSERT INTO articles_fts(rowid, title, excerpt, why_it_matters)
    VALUES (new.pk, new.title, new.excerpt, new.why_it_matters);
END;

CREATE TRIGGER IF NOT EXISTS articles_fts_delete AFTER DELETE ON articles BEGIN
    INSERT INTO articles_fts(articles_fts, rowid, title, excerpt, why_it_matters)
    VALUES ('delete', old.pk, old.title, old.excerpt, old.why_it_matters);
END;

CREATE TRIGGER IF NOT EXISTS articles_fts_update
AFTER UPDATE OF title, excerpt, why_it_matters ON articles BEGIN
    INSERT INTO articles_fts(articles_fts, rowid, title, excerpt, why_it_matters)
    VALUES ('delete', old.pk, old.title, old.excerpt, old.why_it_matters);
    INSERT INTO articles_fts(rowid, title, excerpt, why_it_matters)
    VALUES (new.pk, new.title, new.excerpt, new.why_it_matters);
END;

-- sync_metadata table (single row, id = 1)
CREATE TABLE IF NOT EXISTS sync_metadata (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    last_sync_timestamp TEXT NOT NULL,
    last_sync_completed_at INTEGER NOT NULL,
    total_articles_synced INTEGER NOT NULL,
    sync_type TEXT NOT NULL
);
"#;
