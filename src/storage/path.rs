use std::path::{Component, Path, PathBuf};

/// Join metainfo path parts onto `base`, resolving `.` and `..` lexically.
///
/// Metadata is untrusted: a part may itself contain separators, parent
/// references or a root. The result still has to pass [`is_sub_path`].
pub fn join_lexical<'a, I>(base: &Path, parts: I) -> PathBuf
where
    I: IntoIterator<Item = &'a str>,
{
    let mut path = base.to_path_buf();
    for part in parts {
        for component in Path::new(part).components() {
            match component {
                Component::Normal(c) => path.push(c),
                Component::CurDir => {}
                Component::ParentDir => {
                    path.pop();
                }
                Component::RootDir | Component::Prefix(_) => path = PathBuf::from(component.as_os_str()),
            }
        }
    }
    path
}

/// True if `sub` lies strictly below `base`.
pub fn is_sub_path(base: &Path, sub: &Path) -> bool {
    sub != base && sub.starts_with(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_plain() {
        let base = Path::new("/data");
        let p = join_lexical(base, ["name", "dir", "file.bin"]);
        assert_eq!(p, Path::new("/data/name/dir/file.bin"));
        assert!(is_sub_path(base, &p));
    }

    #[test]
    fn test_join_resolves_dots() {
        let base = Path::new("/data");
        let p = join_lexical(base, ["name", "./a/../b"]);
        assert_eq!(p, Path::new("/data/name/b"));
        assert!(is_sub_path(base, &p));
    }

    #[test]
    fn test_traversal_escapes() {
        let base = Path::new("/data");
        assert!(!is_sub_path(base, &join_lexical(base, ["..", "etc", "passwd"])));
        assert!(!is_sub_path(base, &join_lexical(base, ["name", "../../x"])));
        assert!(!is_sub_path(base, &join_lexical(base, ["/etc/passwd"])));
        assert!(!is_sub_path(Path::new("/data"), Path::new("/database/x")));
        // The base itself is not a file location.
        assert!(!is_sub_path(base, &join_lexical(base, ["a", ".."])));
    }
}
