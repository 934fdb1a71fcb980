/// 보호된 라우트가 요구하는 스코프
#[derive(Debug, Clone)]
pub struct RequiredScope(pub String);

impl RequiredScope {
    pub fn is_satisfied(&self, granted: &[String]) -> bool {
        granted.contains(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_scope() {
        let required = RequiredScope("openid".to_string());
        assert!(required.is_satisfied(&["read".to_string(), "openid".to_string()]));
        assert!(!required.is_satisfied(&["read".to_string()]));
    }
}
