//! # Host Web
//!
//! fx-runtime 的浏览器宿主。
//!
//! 页面只需要给元素加上 `data-fx` 属性：
//!
//! ```html
//! <canvas data-fx="particles" data-fx-threshold="0.1"></canvas>
//! <span data-fx="counter" data-count-to="1250" data-count-duration="1500">0</span>
//! <ul data-fx="reveal" data-reveal-step="80">...</ul>
//!
//! <script type="application/json" id="fx-config">{ "particles": { "base_count": 60 } }</script>
//! ```
//!
//! wasm 模块加载后扫描这些元素并为每个元素创建句柄；`pagehide` 时销毁全部句柄。
//!
//! ## 模块结构
//!
//! - [`attrs`]：`data-*` 属性解析（与平台无关）
//! - `browser`：`BrowserHost`，用浏览器 API 实现 `Host`
//! - `effects`：粒子 canvas、数字滚动、依次出现
//! - `boot`：wasm 入口

pub mod attrs;

#[cfg(target_arch = "wasm32")]
mod boot;
#[cfg(target_arch = "wasm32")]
pub mod browser;
#[cfg(target_arch = "wasm32")]
pub mod effects;

pub use attrs::FxKind;
