use chrono::Utc;
use rusqlite::{Connection, params};
use tasky_core::UserId;

use super::{format_ts, generate_id, parse_ts_or_epoch};
use crate::errors::Result;
use crate::types::{Project, Tag};

/// Project rows.
pub struct ProjectRepository;

impl ProjectRepository {
    /// Create a project.
    pub fn create(conn: &Connection, user: UserId, name: &str, color: Option<&str>) -> Result<Project> {
        let id = generate_id("project");
        let now = format_ts(Utc::now());
        let _ = conn.execute(
            "INSERT INTO projects (id, user_id, name, color, created_at, updated_at)
             VALUES (?1, ?2, ?3, COALESCE(?4, '#2481cc'), ?5, ?5)",
            params![id, user.get(), name, color, now],
        )?;
        let project = conn.query_row("SELECT * FROM projects WHERE id = ?1", params![id], |row| {
            Ok(project_from_row(row))
        })?;
        Ok(project)
    }

    /// Projects of a user, by name.
    pub fn list_for_user(conn: &Connection, user: UserId) -> Result<Vec<Project>> {
        let mut stmt = conn.prepare("SELECT * FROM projects WHERE user_id = ?1 ORDER BY name")?;
        let projects = stmt
            .query_map(params![user.get()], |row| Ok(project_from_row(row)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(projects)
    }
}

/// Tag rows.
pub struct TagRepository;

impl TagRepository {
    /// Create a tag.
    pub fn create(conn: &Connection, user: UserId, name: &str, color: Option<&str>) -> Result<Tag> {
        let id = generate_id("tag");
        let now = format_ts(Utc::now());
        let _ = conn.execute(
            "INSERT INTO tags (id, user_id, name, color, created_at, updated_at)
             VALUES (?1, ?2, ?3, COALESCE(?4, '#6366f1'), ?5, ?5)",
            params![id, user.get(), name, color, now],
        )?;
        let tag = conn.query_row("SELECT * FROM tags WHERE id = ?1", params![id], |row| Ok(tag_from_row(row)))?;
        Ok(tag)
    }

    /// Tags of a user, by name.
    pub fn list_for_user(conn: &Connection, user: UserId) -> Result<Vec<Tag>> {
        let mut stmt = conn.prepare("SELECT * FROM tags WHERE user_id = ?1 ORDER BY name")?;
        let tags = stmt
            .query_map(params![user.get()], |row| Ok(tag_from_row(row)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tags)
    }
}

fn project_from_row(row: &rusqlite::Row<'_>) -> Project {
    let created: String = row.get_unwrap("created_at");
    Project {
        id: row.get_unwrap("id"),
        user_id: UserId(row.get_unwrap("user_id")),
        name: row.get_unwrap("name"),
        color: row.get_unwrap("color"),
        created_at: parse_ts_or_epoch(&created),
    }
}

fn tag_from_row(row: &rusqlite::Row<'_>) -> Tag {
    let created: String = row.get_unwrap("created_at");
    Tag {
        id: row.get_unwrap("id"),
        user_id: UserId(row.get_unwrap("user_id")),
        name: row.get_unwrap("name"),
        color: row.get_unwrap("color"),
        created_at: parse_ts_or_epoch(&created),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::test_support::{add_user, setup_db};

    #[test]
    fn project_defaults_color() {
        let conn = setup_db();
        let user = add_user(&conn, 1);
        let project = ProjectRepository::create(&conn, user, "Inbox", None).unwrap();
        assert_eq!(project.color, "#2481cc");
        assert!(project.id.starts_with("project-"));
    }

    #[test]
    fn names_unique_per_user() {
        let conn = setup_db();
        let a = add_user(&conn, 1);
        let b = add_user(&conn, 2);
        let _ = TagRepository::create(&conn, a, "home", None).unwrap();
        assert!(TagRepository::create(&conn, a, "home", None).is_err());
        let _ = TagRepository::create(&conn, b, "home", Some("#000000")).unwrap();
        assert_eq!(TagRepository::list_for_user(&conn, a).unwrap().len(), 1);
    }

    #[test]
    fn lists_sorted_by_name() {
        let conn = setup_db();
        let user = add_user(&conn, 1);
        let _ = ProjectRepository::create(&conn, user, "Work", None).unwrap();
        let _ = ProjectRepository::create(&conn, user, "Home", None).unwrap();
        let names: Vec<_> = ProjectRepository::list_for_user(&conn, user)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["Home", "Work"]);
    }
}
