mod add;
mod helpers;
mod recipe;
mod settings;
mod summary;

pub(crate) use add::{cmd_add, cmd_clear, cmd_retry};
pub(crate) use recipe::{cmd_recipe_find, cmd_recipe_list, cmd_recipe_save, cmd_recipe_show};
pub(crate) use settings::{cmd_settings_reset, cmd_settings_set, cmd_settings_show};
pub(crate) use summary::{cmd_calendar, cmd_history, cmd_today};
