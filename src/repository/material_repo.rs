// ==========================================
// 成衣厂核价与生产流程系统 - 物料目录仓储
// ==========================================
// 职责: material 表的 CRUD 与库存调整
// 红线: 库存不得为负 (原子条件更新)
// ==========================================

use crate::domain::material::Material;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_datetime, parse_datetime};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    SELECT id, code, name, material_type, unit, cost_per_unit, supplier,
           stock, min_stock, created_at, updated_at
    FROM material
"#;

// ==========================================
// MaterialRepository - 物料仓储
// ==========================================
pub struct MaterialRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MaterialRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入物料
    ///
    /// # 返回
    /// - Err(UniqueConstraintViolation): 编码重复
    pub fn insert(&self, material: &Material) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO material (
                id, code, name, material_type, unit, cost_per_unit, supplier,
                stock, min_stock, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                material.id,
                material.code,
                material.name,
                material.material_type,
                material.unit,
                material.cost_per_unit,
                material.supplier,
                material.stock,
                material.min_stock,
                format_datetime(&material.created_at),
                format_datetime(&material.updated_at),
            ],
        )?;
        Ok(())
    }

    /// 调整库存 (增量可正可负)
    ///
    /// # 返回
    /// - Ok(Material): 调整后的物料
    /// - Err(NotFound): 物料不存在
    /// - Err(FieldValueError): 调整后库存为负
    pub fn adjust_stock(&self, id: &str, delta: f64) -> RepositoryResult<Material> {
        let conn = self.get_conn()?;
        let now = chrono::Local::now().naive_local();

        let rows = conn.execute(
            r#"
            UPDATE material
            SET stock = stock + ?2, updated_at = ?3
            WHERE id = ?1 AND stock + ?2 >= 0
            "#,
            params![id, delta, format_datetime(&now)],
        )?;

        let material = find_one(&conn, id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "Material".to_string(),
            id: id.to_string(),
        })?;

        if rows == 0 {
            return Err(RepositoryError::FieldValueError {
                field: "stock".to_string(),
                message: format!("库存不足: 当前 {}, 调整 {}", material.stock, delta),
            });
        }
        Ok(material)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按ID查询
    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Material>> {
        let conn = self.get_conn()?;
        find_one(&conn, id)
    }

    /// 编码是否已存在
    pub fn exists_code(&self, code: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM material WHERE code = ?1",
            params![code],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// 全部物料 (按编码排序)
    pub fn list_all(&self) -> RepositoryResult<Vec<Material>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY code", SELECT_COLUMNS))?;
        let materials = stmt
            .query_map([], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(materials)
    }

    /// 低库存物料
    ///
    /// 有安全库存的按安全库存判断,否则按全局阈值
    pub fn list_low_stock(&self, threshold: f64) -> RepositoryResult<Vec<Material>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"{}
            WHERE (min_stock IS NOT NULL AND stock < min_stock)
               OR (min_stock IS NULL AND stock < ?1)
            ORDER BY stock ASC, code ASC
            "#,
            SELECT_COLUMNS
        ))?;
        let materials = stmt
            .query_map(params![threshold], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(materials)
    }
}

fn find_one(conn: &Connection, id: &str) -> RepositoryResult<Option<Material>> {
    let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT_COLUMNS))?;
    match stmt.query_row(params![id], map_row) {
        Ok(material) => Ok(Some(material)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn map_row(row: &Row) -> SqliteResult<Material> {
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;
    Ok(Material {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        material_type: row.get(3)?,
        unit: row.get(4)?,
        cost_per_unit: row.get(5)?,
        supplier: row.get(6)?,
        stock: row.get(7)?,
        min_stock: row.get(8)?,
        created_at: parse_datetime(9, &created_at)?,
        updated_at: parse_datetime(10, &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> MaterialRepository {
        let conn = crate::db::open_in_memory().unwrap();
        MaterialRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn make_material(id: &str, code: &str, stock: f64, min_stock: Option<f64>) -> Material {
        let now = chrono::Local::now().naive_local();
        Material {
            id: id.to_string(),
            code: code.to_string(),
            name: format!("物料 {}", code),
            material_type: "FABRIC".to_string(),
            unit: "m".to_string(),
            cost_per_unit: 100.0,
            supplier: Some("供应商A".to_string()),
            stock,
            min_stock,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_insert_and_find() {
        let repo = setup();
        repo.insert(&make_material("M1", "FAB-001", 1500.0, None)).unwrap();

        let found = repo.find_by_id("M1").unwrap().unwrap();
        assert_eq!(found.code, "FAB-001");
        assert_eq!(found.supplier.as_deref(), Some("供应商A"));
        assert!(repo.find_by_id("M404").unwrap().is_none());
        assert!(repo.exists_code("FAB-001").unwrap());
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let repo = setup();
        repo.insert(&make_material("M1", "FAB-001", 1.0, None)).unwrap();
        let err = repo
            .insert(&make_material("M2", "FAB-001", 1.0, None))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }

    #[test]
    fn test_adjust_stock_never_negative() {
        let repo = setup();
        repo.insert(&make_material("M1", "FAB-001", 10.0, None)).unwrap();

        let updated = repo.adjust_stock("M1", -4.0).unwrap();
        assert_eq!(updated.stock, 6.0);

        let err = repo.adjust_stock("M1", -7.0).unwrap_err();
        assert!(matches!(err, RepositoryError::FieldValueError { .. }));
        assert_eq!(repo.find_by_id("M1").unwrap().unwrap().stock, 6.0);

        let err = repo.adjust_stock("M404", 1.0).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_list_low_stock() {
        let repo = setup();
        repo.insert(&make_material("M1", "A", 1500.0, None)).unwrap();
        repo.insert(&make_material("M2", "B", 200.0, None)).unwrap();
        repo.insert(&make_material("M3", "C", 800.0, Some(1000.0))).unwrap();
        repo.insert(&make_material("M4", "D", 100.0, Some(50.0))).unwrap();

        let low: Vec<String> = repo
            .list_low_stock(500.0)
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(low, vec!["M2".to_string(), "M3".to_string()]);
    }
}
