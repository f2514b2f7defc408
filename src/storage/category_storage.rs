use dashmap::DashMap;

use crate::models::Category;
use crate::storage::{CategoryRepository, StorageError};
use crate::types::CategoryId;

pub struct CategoryStorage {
    categories: DashMap<CategoryId, Category>
}

impl CategoryStorage {
    pub fn new() -> Self {
        Self {
            categories: DashMap::new()
        }
    }
}

impl Default for CategoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryRepository for CategoryStorage {
    fn save(&self, category: Category) -> Result<(), StorageError> {
        self.categories.insert(category.id.clone(), category);
        Ok(())
    }

    fn load(&self, category_id: &str) -> Result<Option<Category>, StorageError> {
        Ok(self.categories.get(category_id).map(|entry| entry.value().clone()))
    }

    fn find_all(&self) -> Result<Vec<Category>, StorageError> {
        let mut categories: Vec<Category> = self.categories.iter()
            .map(|entry| entry.value().clone())
            .collect();

        categories.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(categories)
    }
}
