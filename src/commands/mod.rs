//! Host Commands
//!
//! 호스트 앱(UI 브리지)이 호출하는 명령 모음

pub mod vault;
