/// 1行テキスト入力
///
/// カーソル位置は char 単位で保持する（マルチバイト文字でも安全）。
#[derive(Debug, Clone, Default)]
pub struct LineInput {
    pub text: String,
    /// カーソル位置（char単位）
    pub cursor_chars: usize,
}

impl LineInput {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            cursor_chars: text.chars().count(),
        }
    }

    fn byte_pos(&self, chars: usize) -> usize {
        self.text
            .char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    /// カーソル位置に文字を挿入する
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = self.byte_pos(self.cursor_chars);
        self.text.insert(byte_pos, c);
        self.cursor_chars += 1;
    }

    /// カーソル位置の手前の文字を削除する（Backspace）
    pub fn delete_char(&mut self) {
        if self.cursor_chars == 0 {
            return;
        }
        self.cursor_chars -= 1;
        let start = self.byte_pos(self.cursor_chars);
        let end = self.byte_pos(self.cursor_chars + 1);
        self.text.replace_range(start..end, "");
    }

    pub fn move_left(&mut self) {
        self.cursor_chars = self.cursor_chars.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor_chars = (self.cursor_chars + 1).min(self.text.chars().count());
    }

    /// 全クリア（Ctrl+U）
    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor_chars = 0;
    }

    /// 入力内容を取り出してリセットする
    pub fn take(&mut self) -> String {
        self.cursor_chars = 0;
        std::mem::take(&mut self.text)
    }

    /// Text before and after the cursor, for rendering.
    pub fn split_at_cursor(&self) -> (&str, &str) {
        self.text.split_at(self.byte_pos(self.cursor_chars))
    }
}
