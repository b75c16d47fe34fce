//! 浏览器资源：启动、页面与关闭

pub mod headless;

pub use headless::{launch_browser, BrowserHandle, BrowserLauncher};
