use super::*;

#[test]
fn test_page_request_default() {
    let request = PageRequest::default();
    assert_eq!(request.page, 1);
    assert_eq!(request.per_page, 20);
}

#[test]
fn test_page_request_offset() {
    assert_eq!(PageRequest::new(1, 20).offset(), 0);
    assert_eq!(PageRequest::new(2, 20).offset(), 20);
    assert_eq!(PageRequest::new(0, 20).offset(), 0);
}

#[test]
fn test_page_request_limit() {
    assert_eq!(PageRequest::new(1, 50).limit(), 50);
}

#[test]
fn test_normalized_clamps_page_and_size() {
    let request = PageRequest::new(0, 500).normalized(100);
    assert_eq!(request.page, 1);
    assert_eq!(request.per_page, 100);

    let request = PageRequest::new(3, 0).normalized(100);
    assert_eq!(request.page, 3);
    assert_eq!(request.per_page, 0);
}

#[test]
fn test_validate_rejects_zero() {
    assert!(PageRequest::new(0, 10).validate().is_err());
    assert!(PageRequest::new(1, 0).validate().is_err());
    assert!(PageRequest::new(1, 1).validate().is_ok());
}

#[test]
fn test_page_response_new() {
    let data = vec![1, 2, 3];
    let response = PageResponse::new(data.clone(), 1, 10, 3);

    assert_eq!(response.data, data);
    assert_eq!(response.meta.page, 1);
    assert_eq!(response.meta.per_page, 10);
    assert_eq!(response.meta.total, 3);
    assert_eq!(response.meta.total_pages, 1);
}

#[test]
fn test_page_response_pagination() {
    // 25 items, 10 per page -> 3 pages
    let response: PageResponse<i32> = PageResponse::new(vec![], 1, 10, 25);
    assert_eq!(response.meta.total_pages, 3);
}

#[test]
fn test_page_response_empty() {
    let response: PageResponse<i32> = PageResponse::new(vec![], 1, 10, 0);
    assert_eq!(response.meta.total_pages, 0);
}

#[test]
fn test_page_response_map_keeps_meta() {
    let response = PageResponse::new(vec![1, 2], 2, 2, 6).map(|n| n * 10);
    assert_eq!(response.data, vec![10, 20]);
    assert_eq!(response.meta.total_pages, 3);
}

#[test]
fn test_page_request_accepts_size_alias() {
    let request: PageRequest = serde_json::from_str(r#"{"page": 2, "size": 5}"#).unwrap();
    assert_eq!(request.per_page, 5);
}
