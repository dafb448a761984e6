use anyhow::{bail, Context};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{CommentCategory, CommentRecord, RosterEntry, ScoreRecord};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// One score submission, keyed by the natural identifiers a teacher works
/// with. Also the row shape of the import CSV.
#[derive(Debug, serde::Deserialize)]
pub struct ScoreSubmission {
    pub admission_number: String,
    pub subject_code: String,
    pub term_name: String,
    pub academic_year: String,
    pub teacher_code: String,
    pub score: f64,
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let class_id = Uuid::parse_str("7c1d2f6a-3b58-4f0e-9a27-5d8f1b6c4e02")?;
    sqlx::query(
        r#"
        INSERT INTO school_results.classes (id, class_name)
        VALUES ($1, $2)
        ON CONFLICT (class_name) DO NOTHING
        "#,
    )
    .bind(class_id)
    .bind("Form 2")
    .execute(pool)
    .await?;

    let streams = vec![
        (Uuid::parse_str("d94b1c9e-62a7-4c3f-8f15-0a2e7b9d5c11")?, "East"),
        (Uuid::parse_str("4f8a2d71-9c5b-4e06-b3d9-1c7f6a0e8b22")?, "West"),
    ];
    for (id, stream_name) in &streams {
        sqlx::query(
            r#"
            INSERT INTO school_results.streams (id, stream_name)
            VALUES ($1, $2)
            ON CONFLICT (stream_name) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(stream_name)
        .execute(pool)
        .await?;
    }

    sqlx::query(
        r#"
        INSERT INTO school_results.terms (id, term_name, academic_year)
        VALUES ($1, $2, $3)
        ON CONFLICT (term_name, academic_year) DO NOTHING
        "#,
    )
    .bind(Uuid::parse_str("b3e6f8d0-17a4-4b92-8c6e-2f9d0a5b7c33")?)
    .bind("Term 1")
    .bind("2026")
    .execute(pool)
    .await?;

    let teachers = vec![
        (
            Uuid::parse_str("61f0b7a9-8d2c-43e5-9f18-7b4a6c0d2e44")?,
            "TCH-001",
            "Grace Wanjiru",
        ),
        (
            Uuid::parse_str("29c8e5b3-0f76-4a1d-b82c-9e3f5d7a1b55")?,
            "TCH-002",
            "James Mwangi",
        ),
    ];
    for (id, code, name) in &teachers {
        sqlx::query(
            r#"
            INSERT INTO school_results.teachers (id, teacher_code, full_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (teacher_code) DO UPDATE SET full_name = EXCLUDED.full_name
            "#,
        )
        .bind(id)
        .bind(code)
        .bind(name)
        .execute(pool)
        .await?;
    }

    let subjects = vec![
        ("MAT", "Mathematics"),
        ("ENG", "English"),
        ("KIS", "Kiswahili"),
        ("CHE", "Chemistry"),
    ];
    for (code, name) in &subjects {
        sqlx::query(
            r#"
            INSERT INTO school_results.subjects (id, subject_code, subject_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (subject_code) DO UPDATE SET subject_name = EXCLUDED.subject_name
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(code)
        .bind(name)
        .execute(pool)
        .await?;
    }

    let students = vec![
        ("ADM-001", "Amina Yusuf", "East", Some("+254700111222")),
        ("ADM-002", "Brian Otieno", "East", Some("+254700333444")),
        ("ADM-003", "Cynthia Njeri", "West", Some("+254700555666")),
        ("ADM-004", "David Kiprop", "West", None),
    ];
    for (admission, name, stream_name, phone) in students {
        let stream_id: Uuid =
            sqlx::query("SELECT id FROM school_results.streams WHERE stream_name = $1")
                .bind(stream_name)
                .fetch_one(pool)
                .await?
                .get("id");

        sqlx::query(
            r#"
            INSERT INTO school_results.students
            (id, admission_number, full_name, guardian_phone, class_id, stream_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (admission_number) DO UPDATE
            SET full_name = EXCLUDED.full_name, guardian_phone = EXCLUDED.guardian_phone
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(admission)
        .bind(name)
        .bind(phone)
        .bind(class_id)
        .bind(stream_id)
        .execute(pool)
        .await?;
    }

    // Every subject is taught in both streams, split between the two teachers.
    for (index, (code, _)) in subjects.iter().enumerate() {
        let subject_id: Uuid =
            sqlx::query("SELECT id FROM school_results.subjects WHERE subject_code = $1")
                .bind(code)
                .fetch_one(pool)
                .await?
                .get("id");
        for (stream_id, _) in &streams {
            let (teacher_id, _, _) = teachers[index % teachers.len()];
            sqlx::query(
                r#"
                INSERT INTO school_results.assignments
                (id, subject_id, class_id, stream_id, teacher_id)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (subject_id, class_id, stream_id) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(subject_id)
            .bind(class_id)
            .bind(stream_id)
            .bind(teacher_id)
            .execute(pool)
            .await?;
        }
    }

    // David Kiprop stays unscored so roster assembly has an empty aggregate.
    let scores = vec![
        ("ADM-001", "MAT", 84.0),
        ("ADM-001", "ENG", 72.5),
        ("ADM-001", "KIS", 68.0),
        ("ADM-001", "CHE", 79.0),
        ("ADM-002", "MAT", 55.0),
        ("ADM-002", "ENG", 61.0),
        ("ADM-002", "KIS", 47.5),
        ("ADM-002", "CHE", 52.0),
        ("ADM-003", "MAT", 91.0),
        ("ADM-003", "ENG", 66.0),
        ("ADM-003", "KIS", 73.0),
        ("ADM-003", "CHE", 88.5),
    ];
    for (admission, subject_code, value) in scores {
        seed_score(pool, admission, subject_code, "Term 1", "2026", value).await?;
    }

    let comments = vec![
        ("ADM-001", "TCH-001", "recommendation", "Ready for a leadership role next term."),
        ("ADM-001", "TCH-002", "general", "Consistent effort across the term."),
        ("ADM-002", "TCH-002", "academic", "Kiswahili comprehension needs daily practice."),
    ];
    for (admission, teacher_code, comment_type, text) in comments {
        let student_id: Uuid =
            sqlx::query("SELECT id FROM school_results.students WHERE admission_number = $1")
                .bind(admission)
                .fetch_one(pool)
                .await?
                .get("id");
        let teacher_id: Uuid =
            sqlx::query("SELECT id FROM school_results.teachers WHERE teacher_code = $1")
                .bind(teacher_code)
                .fetch_one(pool)
                .await?
                .get("id");
        let term_id: Uuid = sqlx::query(
            "SELECT id FROM school_results.terms WHERE term_name = $1 AND academic_year = $2",
        )
        .bind("Term 1")
        .bind("2026")
        .fetch_one(pool)
        .await?
        .get("id");

        sqlx::query(
            r#"
            INSERT INTO school_results.comments
            (id, student_id, teacher_id, term_id, comment_type, comment_text)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(teacher_id)
        .bind(term_id)
        .bind(comment_type)
        .bind(text)
        .execute(pool)
        .await?;
    }

    Ok(())
}

async fn seed_score(
    pool: &PgPool,
    admission_number: &str,
    subject_code: &str,
    term_name: &str,
    academic_year: &str,
    value: f64,
) -> anyhow::Result<()> {
    let student = sqlx::query(
        "SELECT id, class_id, stream_id FROM school_results.students WHERE admission_number = $1",
    )
    .bind(admission_number)
    .fetch_one(pool)
    .await?;
    let student_id: Uuid = student.get("id");
    let class_id: Uuid = student.get("class_id");
    let stream_id: Uuid = student.get("stream_id");

    let assignment = sqlx::query(
        r#"
        SELECT a.id, a.teacher_id FROM school_results.assignments a
        JOIN school_results.subjects sub ON sub.id = a.subject_id
        WHERE sub.subject_code = $1 AND a.class_id = $2 AND a.stream_id = $3 AND a.is_active
        "#,
    )
    .bind(subject_code)
    .bind(class_id)
    .bind(stream_id)
    .fetch_one(pool)
    .await?;
    let assignment_id: Uuid = assignment.get("id");
    let teacher_id: Uuid = assignment.get("teacher_id");

    let term_id: Uuid = sqlx::query(
        "SELECT id FROM school_results.terms WHERE term_name = $1 AND academic_year = $2",
    )
    .bind(term_name)
    .bind(academic_year)
    .fetch_one(pool)
    .await?
    .get("id");

    sqlx::query(
        r#"
        INSERT INTO school_results.scores
        (id, assignment_id, student_id, term_id, score, submitted_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (assignment_id, student_id, term_id) DO UPDATE
        SET score = EXCLUDED.score, submitted_by = EXCLUDED.submitted_by, submitted_at = now()
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(assignment_id)
    .bind(student_id)
    .bind(term_id)
    .bind(value)
    .bind(teacher_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_student(
    pool: &PgPool,
    admission_number: &str,
) -> anyhow::Result<Option<RosterEntry>> {
    let row = sqlx::query(
        r#"
        SELECT st.id AS student_id, st.admission_number, st.full_name, st.guardian_phone,
               c.class_name, s.stream_name
        FROM school_results.students st
        JOIN school_results.classes c ON c.id = st.class_id
        JOIN school_results.streams s ON s.id = st.stream_id
        WHERE st.admission_number = $1 AND st.is_active
        "#,
    )
    .bind(admission_number)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| RosterEntry {
        student_id: row.get("student_id"),
        admission_number: row.get("admission_number"),
        fullname: row.get("full_name"),
        class_name: row.get("class_name"),
        stream_name: row.get("stream_name"),
        guardian_phone: row.get("guardian_phone"),
    }))
}

pub async fn fetch_scores_for_student(
    pool: &PgPool,
    student_id: Uuid,
    term_name: &str,
    academic_year: &str,
) -> anyhow::Result<Vec<ScoreRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT sc.student_id, sub.id AS subject_id, sub.subject_name,
               t.full_name AS teacher_name, sc.score
        FROM school_results.scores sc
        JOIN school_results.assignments a ON a.id = sc.assignment_id
        JOIN school_results.subjects sub ON sub.id = a.subject_id
        JOIN school_results.teachers t ON t.id = a.teacher_id
        JOIN school_results.terms tm ON tm.id = sc.term_id
        WHERE sc.student_id = $1 AND tm.term_name = $2 AND tm.academic_year = $3
        ORDER BY sub.subject_name ASC
        "#,
    )
    .bind(student_id)
    .bind(term_name)
    .bind(academic_year)
    .fetch_all(pool)
    .await?;

    let mut records = Vec::new();
    for row in rows {
        records.push(ScoreRecord {
            student_id: row.get("student_id"),
            subject_id: row.get("subject_id"),
            subject_name: row.get("subject_name"),
            teacher_name: row.get("teacher_name"),
            value: row.get("score"),
        });
    }

    tracing::debug!(student = %student_id, rows = records.len(), "fetched student scores");
    Ok(records)
}

pub async fn fetch_cohort_roster(
    pool: &PgPool,
    class_name: &str,
    stream_name: Option<&str>,
) -> anyhow::Result<Vec<RosterEntry>> {
    let mut query = String::from(
        "SELECT st.id AS student_id, st.admission_number, st.full_name, st.guardian_phone, \
         c.class_name, s.stream_name \
         FROM school_results.students st \
         JOIN school_results.classes c ON c.id = st.class_id \
         JOIN school_results.streams s ON s.id = st.stream_id \
         WHERE c.class_name = $1 AND st.is_active",
    );

    if stream_name.is_some() {
        query.push_str(" AND s.stream_name = $2");
    }
    query.push_str(" ORDER BY st.full_name ASC");

    let mut rows = sqlx::query(&query).bind(class_name);
    if let Some(value) = stream_name {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut roster = Vec::new();
    for row in records {
        roster.push(RosterEntry {
            student_id: row.get("student_id"),
            admission_number: row.get("admission_number"),
            fullname: row.get("full_name"),
            class_name: row.get("class_name"),
            stream_name: row.get("stream_name"),
            guardian_phone: row.get("guardian_phone"),
        });
    }

    Ok(roster)
}

pub async fn fetch_scores_for_cohort(
    pool: &PgPool,
    class_name: &str,
    stream_name: Option<&str>,
    term_name: &str,
    academic_year: &str,
) -> anyhow::Result<Vec<ScoreRecord>> {
    let mut query = String::from(
        "SELECT sc.student_id, sub.id AS subject_id, sub.subject_name, \
         t.full_name AS teacher_name, sc.score \
         FROM school_results.scores sc \
         JOIN school_results.students st ON st.id = sc.student_id \
         JOIN school_results.classes c ON c.id = st.class_id \
         JOIN school_results.streams s ON s.id = st.stream_id \
         JOIN school_results.assignments a ON a.id = sc.assignment_id \
         JOIN school_results.subjects sub ON sub.id = a.subject_id \
         JOIN school_results.teachers t ON t.id = a.teacher_id \
         JOIN school_results.terms tm ON tm.id = sc.term_id \
         WHERE c.class_name = $1 AND tm.term_name = $2 AND tm.academic_year = $3 \
         AND st.is_active",
    );

    if stream_name.is_some() {
        query.push_str(" AND s.stream_name = $4");
    }
    query.push_str(" ORDER BY st.full_name ASC, sub.subject_name ASC");

    let mut rows = sqlx::query(&query)
        .bind(class_name)
        .bind(term_name)
        .bind(academic_year);
    if let Some(value) = stream_name {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut scores = Vec::new();
    for row in records {
        scores.push(ScoreRecord {
            student_id: row.get("student_id"),
            subject_id: row.get("subject_id"),
            subject_name: row.get("subject_name"),
            teacher_name: row.get("teacher_name"),
            value: row.get("score"),
        });
    }

    tracing::debug!(class = class_name, rows = scores.len(), "fetched cohort scores");
    Ok(scores)
}

pub async fn fetch_comments(
    pool: &PgPool,
    student_id: Uuid,
    term_name: &str,
    academic_year: &str,
) -> anyhow::Result<Vec<CommentRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT cm.comment_type, cm.comment_text
        FROM school_results.comments cm
        JOIN school_results.terms tm ON tm.id = cm.term_id
        WHERE cm.student_id = $1 AND tm.term_name = $2 AND tm.academic_year = $3
        ORDER BY cm.created_at ASC
        "#,
    )
    .bind(student_id)
    .bind(term_name)
    .bind(academic_year)
    .fetch_all(pool)
    .await?;

    let mut comments = Vec::new();
    for row in rows {
        let raw_category: String = row.get("comment_type");
        let category = CommentCategory::parse(&raw_category)
            .with_context(|| format!("unknown comment category '{raw_category}'"))?;
        comments.push(CommentRecord {
            category,
            text: row.get("comment_text"),
        });
    }

    Ok(comments)
}

/// Find-or-create-else-update on the score natural key
/// (assignment, student, term). Rejects out-of-range values and submissions
/// from a teacher who does not own the assignment.
pub async fn upsert_score(pool: &PgPool, submission: &ScoreSubmission) -> anyhow::Result<()> {
    if !(0.0..=100.0).contains(&submission.score) {
        bail!(
            "score {} for {} must be between 0 and 100",
            submission.score,
            submission.admission_number
        );
    }

    let student = sqlx::query(
        "SELECT id, class_id, stream_id FROM school_results.students \
         WHERE admission_number = $1 AND is_active",
    )
    .bind(&submission.admission_number)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("no active student {}", submission.admission_number))?;
    let student_id: Uuid = student.get("id");
    let class_id: Uuid = student.get("class_id");
    let stream_id: Uuid = student.get("stream_id");

    let term_id: Uuid = sqlx::query(
        "SELECT id FROM school_results.terms WHERE term_name = $1 AND academic_year = $2",
    )
    .bind(&submission.term_name)
    .bind(&submission.academic_year)
    .fetch_optional(pool)
    .await?
    .with_context(|| {
        format!(
            "no term {} {}",
            submission.term_name, submission.academic_year
        )
    })?
    .get("id");

    let teacher_id: Uuid =
        sqlx::query("SELECT id FROM school_results.teachers WHERE teacher_code = $1")
            .bind(&submission.teacher_code)
            .fetch_optional(pool)
            .await?
            .with_context(|| format!("no teacher {}", submission.teacher_code))?
            .get("id");

    let assignment_id: Uuid = sqlx::query(
        r#"
        SELECT a.id FROM school_results.assignments a
        JOIN school_results.subjects sub ON sub.id = a.subject_id
        WHERE sub.subject_code = $1 AND a.class_id = $2 AND a.stream_id = $3
          AND a.teacher_id = $4 AND a.is_active
        "#,
    )
    .bind(&submission.subject_code)
    .bind(class_id)
    .bind(stream_id)
    .bind(teacher_id)
    .fetch_optional(pool)
    .await?
    .with_context(|| {
        format!(
            "teacher {} is not assigned to {} for this class/stream",
            submission.teacher_code, submission.subject_code
        )
    })?
    .get("id");

    sqlx::query(
        r#"
        INSERT INTO school_results.scores
        (id, assignment_id, student_id, term_id, score, submitted_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (assignment_id, student_id, term_id) DO UPDATE
        SET score = EXCLUDED.score, submitted_by = EXCLUDED.submitted_by, submitted_at = now()
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(assignment_id)
    .bind(student_id)
    .bind(term_id)
    .bind(submission.score)
    .bind(teacher_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut submitted = 0usize;

    for result in reader.deserialize::<ScoreSubmission>() {
        let submission = result?;
        upsert_score(pool, &submission).await.with_context(|| {
            format!(
                "failed to submit {} {} for {}",
                submission.subject_code, submission.score, submission.admission_number
            )
        })?;
        submitted += 1;
    }

    tracing::info!(rows = submitted, path = %csv_path.display(), "imported score submissions");
    Ok(submitted)
}
