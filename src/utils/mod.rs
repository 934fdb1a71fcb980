//! 공용 유틸리티
//!
//! - [`random`]: 주입 가능한 난수 소스 (엔트로피 실패를 에러로 전달)
//! - [`clock`]: 주입 가능한 시계 (TOTP 윈도우, 만료 판정)
//! - [`digest`]: SHA-256 저장용 해시, 상수 시간 비교
//! - [`string_utils`]: 입력 정리, 스코프 문자열 처리
//! - [`display_terminal`]: 기동 로그 출력

pub mod clock;
pub mod digest;
pub mod display_terminal;
pub mod random;
pub mod string_utils;

pub use clock::{Clock, SystemClock};
pub use random::{OsRandomSource, RandomSource};
