use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuCategory {
    pub id: i64,
    pub restaurant_id: i64,
    pub name: String,
    pub sort_order: i64,
}

/// A dish or drink on a restaurant's menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i64,
    pub restaurant_id: i64,
    pub category_id: Option<i64>,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMenuCategoryRequest {
    pub restaurant_id: i64,
    pub name: String,
    #[serde(default)]
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMenuItemRequest {
    pub restaurant_id: i64,
    pub category_id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub image_url: Option<String>,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMenuItemRequest {
    pub category_id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MenuItemFilters {
    pub restaurant_id: Option<i64>,
    pub category_id: Option<i64>,
    pub search: Option<String>,
    pub available_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuSection {
    pub category: MenuCategory,
    pub items: Vec<MenuItem>,
}

/// Full menu of one restaurant grouped by category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuResponse {
    pub restaurant_id: i64,
    pub sections: Vec<MenuSection>,
    pub uncategorized: Vec<MenuItem>,
}

impl MenuItem {
    pub fn update(&mut self, request: UpdateMenuItemRequest) {
        if let Some(category_id) = request.category_id {
            self.category_id = Some(category_id);
        }
        if let Some(name) = request.name {
            self.name = name;
        }
        if let Some(description) = request.description {
            self.description = description;
        }
        if let Some(price) = request.price {
            self.price = price;
        }
        if let Some(image_url) = request.image_url {
            self.image_url = Some(image_url);
        }
        if let Some(is_available) = request.is_available {
            self.is_available = is_available;
        }
        self.updated_at = Utc::now();
    }
}

impl MenuResponse {
    /// Group items under their categories, keeping category sort order.
    /// Items pointing at an unknown category end up in `uncategorized`.
    pub fn build(restaurant_id: i64, mut categories: Vec<MenuCategory>, items: Vec<MenuItem>) -> Self {
        categories.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.id.cmp(&b.id)));

        let mut sections: Vec<MenuSection> = categories
            .into_iter()
            .map(|category| MenuSection {
                category,
                items: Vec::new(),
            })
            .collect();
        let mut uncategorized = Vec::new();

        for item in items {
            let section = item
                .category_id
                .and_then(|id| sections.iter_mut().find(|s| s.category.id == id));
            match section {
                Some(section) => section.items.push(item),
                None => uncategorized.push(item),
            }
        }

        Self {
            restaurant_id,
            sections,
            uncategorized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(id: i64, category_id: Option<i64>) -> MenuItem {
        let now = Utc::now();
        MenuItem {
            id,
            restaurant_id: 1,
            category_id,
            name: format!("Dish {}", id),
            description: String::new(),
            price: dec!(9.50),
            image_url: None,
            is_available: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn category(id: i64, sort_order: i64) -> MenuCategory {
        MenuCategory {
            id,
            restaurant_id: 1,
            name: format!("Category {}", id),
            sort_order,
        }
    }

    #[test]
    fn test_menu_grouping() {
        let menu = MenuResponse::build(
            1,
            vec![category(10, 2), category(11, 1)],
            vec![item(1, Some(10)), item(2, Some(11)), item(3, None), item(4, Some(99))],
        );

        assert_eq!(menu.sections.len(), 2);
        assert_eq!(menu.sections[0].category.id, 11);
        assert_eq!(menu.sections[0].items[0].id, 2);
        assert_eq!(menu.sections[1].items[0].id, 1);

        let uncategorized: Vec<i64> = menu.uncategorized.iter().map(|i| i.id).collect();
        assert_eq!(uncategorized, vec![3, 4]);
    }

    #[test]
    fn test_menu_item_update() {
        let mut dish = item(1, None);
        dish.update(UpdateMenuItemRequest {
            price: Some(dec!(11.00)),
            is_available: Some(false),
            ..Default::default()
        });

        assert_eq!(dish.price, dec!(11.00));
        assert!(!dish.is_available);
        assert_eq!(dish.name, "Dish 1");
    }
}
