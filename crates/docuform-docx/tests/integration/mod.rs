mod html_templates;
mod word_documents;
