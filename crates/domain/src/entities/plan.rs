use serde::{Deserialize, Serialize};

use crate::value_objects::PlanId;

/// 订阅套餐。服务端只读。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub name: String,
    /// 持有该套餐的客户能否登录客户面板
    pub can_access_client_panel: bool,
}
