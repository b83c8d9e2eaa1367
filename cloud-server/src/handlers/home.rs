//! Status page

use axum::response::Html;

const STATUS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>FireSentinel Alert Server</title>
    <style>
        body { font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto; padding: 20px; }
        h1 { color: #d62728; }
        .status { font-size: 18px; margin: 20px 0; padding: 10px; background-color: #f0f0f0; border-radius: 5px; }
    </style>
</head>
<body>
    <h1>FireSentinel Alert Server</h1>
    <div class="status">Collector is running and ready to receive field alerts.</div>
    <p>Alert images and their metadata are stored in the artifact directory.</p>
    <p>Images are re-validated by the vision model before a voice alert is placed.</p>
</body>
</html>
"#;

pub async fn index() -> Html<&'static str> {
    Html(STATUS_PAGE)
}
