use sqlx::PgPool;

/// Creates the full schema. Every statement is idempotent, so running the
/// migration against an existing database is a no-op.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id             BIGSERIAL PRIMARY KEY,
            email          TEXT NOT NULL UNIQUE,
            password_hash  TEXT NOT NULL,
            role           TEXT NOT NULL,
            status         TEXT NOT NULL,
            first_name     TEXT NOT NULL,
            last_name      TEXT NOT NULL,
            created_at     TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at     TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS players (
            id                 BIGSERIAL PRIMARY KEY,
            user_id            BIGINT NOT NULL UNIQUE REFERENCES users(id),
            sports             TEXT[] NOT NULL,
            date_of_birth      DATE,
            emergency_contact  TEXT,
            created_at         TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at         TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS coaches (
            id              BIGSERIAL PRIMARY KEY,
            user_id         BIGINT NOT NULL UNIQUE REFERENCES users(id),
            specialization  TEXT,
            bio             TEXT,
            created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at      TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS games (
            id           BIGSERIAL PRIMARY KEY,
            name         TEXT NOT NULL,
            description  TEXT,
            created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at   TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS batches (
            id          BIGSERIAL PRIMARY KEY,
            name        TEXT NOT NULL,
            game_id     BIGINT NOT NULL REFERENCES games(id),
            coach_id    BIGINT REFERENCES coaches(id),
            schedule    TEXT,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS training_sessions (
            id          BIGSERIAL PRIMARY KEY,
            batch_id    BIGINT NOT NULL REFERENCES batches(id),
            title       TEXT,
            starts_at   TIMESTAMPTZ NOT NULL,
            ends_at     TIMESTAMPTZ NOT NULL,
            location    TEXT,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attendance (
            id          BIGSERIAL PRIMARY KEY,
            session_id  BIGINT NOT NULL REFERENCES training_sessions(id),
            player_id   BIGINT NOT NULL REFERENCES players(id),
            status      TEXT NOT NULL,
            note        TEXT,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
            UNIQUE (session_id, player_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS payments (
            id            BIGSERIAL PRIMARY KEY,
            player_id     BIGINT NOT NULL REFERENCES players(id),
            amount_cents  BIGINT NOT NULL,
            status        TEXT NOT NULL,
            due_date      DATE NOT NULL,
            paid_at       TIMESTAMPTZ,
            description   TEXT,
            created_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at    TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS performance_notes (
            id          BIGSERIAL PRIMARY KEY,
            player_id   BIGINT NOT NULL REFERENCES players(id),
            coach_id    BIGINT REFERENCES coaches(id),
            note        TEXT NOT NULL,
            rating      SMALLINT,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    for index in [
        "CREATE INDEX IF NOT EXISTS idx_batches_game ON batches (game_id)",
        "CREATE INDEX IF NOT EXISTS idx_batches_coach ON batches (coach_id)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_batch ON training_sessions (batch_id)",
        "CREATE INDEX IF NOT EXISTS idx_attendance_player ON attendance (player_id)",
        "CREATE INDEX IF NOT EXISTS idx_payments_player ON payments (player_id)",
        "CREATE INDEX IF NOT EXISTS idx_notes_player ON performance_notes (player_id)",
    ] {
        sqlx::query(index).execute(pool).await?;
    }

    Ok(())
}
