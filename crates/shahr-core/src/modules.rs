//! Permission-gated dashboard modules.

use serde::{Deserialize, Serialize};

use crate::types::{Permission, User};

/// A dashboard module, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleId {
    Overview,
    Chat,
    Documents,
    Predictions,
    Reports,
    Users,
}

impl ModuleId {
    pub const ALL: [ModuleId; 6] = [
        ModuleId::Overview,
        ModuleId::Chat,
        ModuleId::Documents,
        ModuleId::Predictions,
        ModuleId::Reports,
        ModuleId::Users,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ModuleId::Overview => "داشبورد اصلی",
            ModuleId::Chat => "چت با هوش مصنوعی",
            ModuleId::Documents => "مدیریت اسناد",
            ModuleId::Predictions => "پیش‌بینی و تحلیل",
            ModuleId::Reports => "گزارش‌ساز",
            ModuleId::Users => "مدیریت کاربران",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ModuleId::Overview => "نمای کلی سامانه",
            ModuleId::Chat => "پرسش از اسناد بارگذاری شده",
            ModuleId::Documents => "آپلود و مدیریت مستندات",
            ModuleId::Predictions => "پیش‌بینی‌های شهری",
            ModuleId::Reports => "ایجاد گزارش‌های تخصصی",
            ModuleId::Users => "مدیریت دسترسی‌ها",
        }
    }

    /// `None` for modules every authenticated user can open.
    pub fn required_permission(self) -> Option<Permission> {
        match self {
            ModuleId::Overview | ModuleId::Chat => None,
            ModuleId::Documents => Some(Permission::Documents),
            ModuleId::Predictions => Some(Permission::Predictions),
            ModuleId::Reports => Some(Permission::Reports),
            ModuleId::Users => Some(Permission::Users),
        }
    }

    pub fn is_available_to(self, user: &User) -> bool {
        self.required_permission()
            .map_or(true, |p| user.has_permission(p))
    }
}

/// Modules the user can reach, in display order.
pub fn available_modules(user: &User) -> Vec<ModuleId> {
    ModuleId::ALL
        .into_iter()
        .filter(|m| m.is_available_to(user))
        .collect()
}
