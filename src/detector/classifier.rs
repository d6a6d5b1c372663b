//! URL分类器：区分可能包含核心运行时标识的“优先”分块与其他分块

use url::Url;

/// 优先分块文件名特征（区分大小写）
const PRIORITY_TOKENS: [&str; 2] = ["framework", "main"];

/// 分类结果，三个列表均按字典序排列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedUrls {
    pub priority: Vec<String>,
    pub other: Vec<String>,
    pub all: Vec<String>,
}

/// URL分类器
pub struct UrlClassifier;

impl UrlClassifier {
    /// 对URL集合分类
    pub fn classify<'a, I>(urls: I) -> ClassifiedUrls
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut priority = Vec::new();
        let mut other = Vec::new();

        for url in urls {
            if Self::is_priority(url) {
                priority.push(url.clone());
            } else {
                other.push(url.clone());
            }
        }

        priority.sort();
        other.sort();
        let mut all: Vec<String> = priority.iter().chain(other.iter()).cloned().collect();
        all.sort();

        ClassifiedUrls { priority, other, all }
    }

    /// 最后一个路径段包含 framework 或 main
    pub fn is_priority(url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let file_name = parsed.path().rsplit('/').next().unwrap_or_default();
        PRIORITY_TOKENS.iter().any(|token| file_name.contains(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_sorted_and_disjoint() {
        let urls = vec![
            "https://x.test/_next/static/chunks/pages/index-1.js".to_string(),
            "https://x.test/_next/static/chunks/main-2.js".to_string(),
            "https://x.test/_next/static/chunks/framework-3.js".to_string(),
            "https://x.test/main/static/chunks/webpack-4.js".to_string(),
        ];

        let classified = UrlClassifier::classify(urls.iter());
        assert_eq!(
            classified.priority,
            vec![
                "https://x.test/_next/static/chunks/framework-3.js".to_string(),
                "https://x.test/_next/static/chunks/main-2.js".to_string(),
            ]
        );
        // 目录名中的 main 不计入
        assert_eq!(
            classified.other,
            vec![
                "https://x.test/_next/static/chunks/pages/index-1.js".to_string(),
                "https://x.test/main/static/chunks/webpack-4.js".to_string(),
            ]
        );
        let mut expected_all = urls.clone();
        expected_all.sort();
        assert_eq!(classified.all, expected_all);
    }

    #[test]
    fn test_classify_is_order_independent() {
        let a = vec!["https://x.test/b-main.js".to_string(), "https://x.test/a.js".to_string()];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(UrlClassifier::classify(a.iter()), UrlClassifier::classify(b.iter()));
    }

    #[test]
    fn test_case_sensitive_and_empty() {
        assert!(!UrlClassifier::is_priority("https://x.test/Framework.js"));
        assert!(!UrlClassifier::is_priority("not a url"));
        assert_eq!(UrlClassifier::classify(Vec::<String>::new().iter()), ClassifiedUrls::default());
    }
}
