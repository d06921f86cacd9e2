//! Properties that listeners can rewrite through hooks fired in the entity's
//! type path namespace.

use super::Entity;
use crate::context::DataContext;
use crate::error::DataError;
use crate::Guid;
use platform_events::{HookValue, Params};
use serde_json::{json, Value};

impl Entity {
    /// Canonical URL (`property:url`). `None` until the entity is saved.
    pub fn url(&self, ctx: &DataContext) -> Result<Option<String>, DataError> {
        let Some(guid) = self.guid else {
            return Ok(None);
        };
        let default = format!("{}object/{}", ctx.wwwroot(), guid);
        let value = self.hook(ctx, "property:url", Params::new(), HookValue::from(default.clone()))?;
        Ok(Some(value.as_str().map(str::to_string).unwrap_or(default)))
    }

    /// Icon URL for `size` (`property:icon`). Empty unless a listener sets one.
    pub fn icon(&self, ctx: &DataContext, size: &str) -> Result<String, DataError> {
        let params = Params::new().with("size", size);
        let value = self.hook(ctx, "property:icon", params, HookValue::from(""))?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Whether `user` may edit this entity (`canedit`). Denied by default.
    pub fn can_edit(&self, ctx: &DataContext, user: Option<Guid>) -> Result<bool, DataError> {
        self.permission(ctx, "canedit", user, false)
    }

    /// Whether `user` may view this entity (`canview`). Allowed by default.
    pub fn can_view(&self, ctx: &DataContext, user: Option<Guid>) -> Result<bool, DataError> {
        self.permission(ctx, "canview", user, true)
    }

    /// JSON snapshot of the entity including its URL.
    pub fn export(&self, ctx: &DataContext) -> Result<Value, DataError> {
        Ok(json!({
            "guid": self.guid,
            "type": self.type_path(),
            "handling_class": self.handling_class(),
            "created_ts": self.created_ts,
            "attributes": self.attributes,
            "url": self.url(ctx)?,
        }))
    }

    fn permission(
        &self,
        ctx: &DataContext,
        hook: &str,
        user: Option<Guid>,
        default: bool,
    ) -> Result<bool, DataError> {
        let params = Params::new().with("user", user);
        let value = self.hook(ctx, hook, params, HookValue::Bool(default))?;
        Ok(value.as_bool().unwrap_or_else(|| value.is_set()))
    }

    fn hook<'a>(
        &'a self,
        ctx: &DataContext,
        hook: &str,
        params: Params<'a>,
        default: HookValue,
    ) -> Result<HookValue, DataError> {
        let params = params.with("guid", self.guid).with_object(self);
        Ok(ctx.events().trigger_hook(&self.type_path(), hook, &params, default)?)
    }
}
