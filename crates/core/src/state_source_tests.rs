// SPDX-License-Identifier: MIT

use super::*;

struct Fixed(Vec<String>);

impl TaskStateSource for Fixed {
    fn running_process_names(&self) -> Vec<String> {
        self.0.clone()
    }
}

#[test]
fn implementors_can_report_an_empty_process_set() {
    let source = Fixed(Vec::new());
    assert!(source.running_process_names().is_empty());
}

#[test]
fn implementors_report_the_names_they_are_given() {
    let source = Fixed(vec!["webserver".into(), "healthcheck".into()]);
    assert_eq!(
        source.running_process_names(),
        vec!["webserver".to_string(), "healthcheck".to_string()]
    );
}
